use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use lumos_script::{LibrarySet, ScriptConfig, ValueKind};

#[derive(Parser, Debug)]
#[command(
    about = "Loads a Lua script and prints values resolved from its globals",
    version
)]
pub struct Args {
    /// JSON file with scripts_root, script and libraries; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory scripts are loaded from (default: scripts)
    #[arg(long)]
    pub scripts_root: Option<PathBuf>,

    /// Script to load, relative to the scripts root unless absolute (default: test.lua)
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Standard libraries opened for the script: safe or base
    #[arg(long)]
    pub libs: Option<LibrarySet>,

    /// Dotted path to resolve, optionally suffixed with :KIND (bool, int, float, string, ints)
    #[arg(long = "get", value_name = "PATH[:KIND]")]
    pub gets: Vec<Query>,

    /// Dotted path of a table whose integer values should be listed
    #[arg(long = "ints", value_name = "PATH")]
    pub int_vectors: Vec<String>,

    /// Path to write the resolved values and diagnostics as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Fail instead of falling back to defaults when the script does not load
    #[arg(long)]
    pub strict: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub pause: bool,
}

/// One `--get` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: String,
    pub kind: ValueKind,
}

impl FromStr for Query {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        match text.rsplit_once(':') {
            Some((path, kind)) => Ok(Query {
                path: path.to_string(),
                kind: kind
                    .parse()
                    .map_err(|err| anyhow!("invalid query '{text}': {err}"))?,
            }),
            None => Ok(Query {
                path: text.to_string(),
                kind: ValueKind::String,
            }),
        }
    }
}

#[derive(Debug)]
pub struct RunArgs {
    pub config: ScriptConfig,
    pub queries: Vec<Query>,
    pub json: Option<PathBuf>,
    pub strict: bool,
    pub pause: bool,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        let mut config = match self.config.as_ref() {
            Some(path) => ScriptConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ScriptConfig::default(),
        };
        if let Some(root) = self.scripts_root {
            config.scripts_root = root;
        }
        if let Some(script) = self.script {
            config.script = script;
        }
        if let Some(libs) = self.libs {
            config.libraries = libs;
        }

        let mut queries = self.gets;
        queries.extend(self.int_vectors.into_iter().map(|path| Query {
            path,
            kind: ValueKind::IntSequence,
        }));

        Ok(RunArgs {
            config,
            queries,
            json: self.json,
            strict: self.strict,
            pause: self.pause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_kind_suffix_is_optional() {
        let query: Query = "player.name".parse().expect("query");
        assert_eq!(query.kind, ValueKind::String);
        let query: Query = "player.stats.hp:int".parse().expect("query");
        assert_eq!(query.path, "player.stats.hp");
        assert_eq!(query.kind, ValueKind::Integer);
        assert!("player:matrix".parse::<Query>().is_err());
    }

    #[test]
    fn flags_override_defaults_and_collect_queries() {
        let args = Args::try_parse_from([
            "lumos_host",
            "--scripts-root",
            "levels",
            "--libs",
            "base",
            "--get",
            "x:int",
            "--ints",
            "list",
            "--pause",
        ])
        .expect("arguments parse");
        let run = args.into_run_args().expect("run args");
        assert_eq!(run.config.scripts_root, PathBuf::from("levels"));
        assert_eq!(run.config.script, PathBuf::from("test.lua"));
        assert_eq!(run.config.libraries, LibrarySet::Base);
        assert_eq!(run.queries.len(), 2);
        assert_eq!(run.queries[1].kind, ValueKind::IntSequence);
        assert!(run.pause);
        assert!(!run.strict);
    }

    #[test]
    fn libs_flag_accepts_safe_and_base_only() {
        for (value, expected) in [("safe", LibrarySet::Safe), ("base", LibrarySet::Base)] {
            let args = Args::try_parse_from(["lumos_host", "--libs", value])
                .expect("arguments parse");
            let run = args.into_run_args().expect("run args");
            assert_eq!(run.config.libraries, expected, "--libs {value}");
        }

        let run = Args::try_parse_from(["lumos_host"])
            .expect("arguments parse")
            .into_run_args()
            .expect("run args");
        assert_eq!(run.config.libraries, LibrarySet::Safe);

        for value in ["all", "none", ""] {
            assert!(
                Args::try_parse_from(["lumos_host", "--libs", value]).is_err(),
                "--libs {value} should be rejected"
            );
        }
    }
}
