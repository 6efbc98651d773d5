use anyhow::Result;

mod cli;
mod runtime;

fn main() -> Result<()> {
    let args = cli::parse()?;

    env_logger::init();

    runtime::execute(args)
}
