use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use lumos_script::{ScriptHost, ScriptValue, ValueKind};
use serde::Serialize;

use crate::cli::RunArgs;

#[derive(Debug, Serialize)]
struct ResolvedEntry {
    path: String,
    kind: ValueKind,
    value: ScriptValue,
}

#[derive(Debug, Serialize)]
struct ResolutionReport {
    script: String,
    loaded: bool,
    values: Vec<ResolvedEntry>,
    diagnostics: Vec<String>,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        config,
        queries,
        json,
        strict,
        pause,
    } = args;

    let host = if strict {
        ScriptHost::try_load(&config).context("loading script")?
    } else {
        ScriptHost::load(&config)
    };
    if host.is_loaded() {
        println!("Loaded script {}", host.origin());
    } else {
        eprintln!(
            "[lumos_host] warning: script {} not loaded; every value falls back to its default",
            host.origin()
        );
    }

    let mut env = host.environment();
    let mut values = Vec::with_capacity(queries.len());
    for query in queries {
        let value = env.resolve_kind(&query.path, query.kind);
        println!("{} ({}) = {}", query.path, query.kind, value);
        values.push(ResolvedEntry {
            path: query.path,
            kind: query.kind,
            value,
        });
    }

    log::info!(
        "resolved {} path(s) from {}, stack depth {}",
        values.len(),
        host.origin(),
        env.stack_depth()
    );

    let diagnostics: Vec<String> = env
        .take_diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect();
    if !diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for diagnostic in &diagnostics {
            println!("  - {diagnostic}");
        }
    }

    if let Some(path) = json.as_ref() {
        let report = ResolutionReport {
            script: host.origin().to_string(),
            loaded: host.is_loaded(),
            values,
            diagnostics,
        };
        let json = serde_json::to_string_pretty(&report)
            .context("serializing resolution report to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing resolution report to {}", path.display()))?;
        println!("Saved resolution report to {}", path.display());
    }

    if pause {
        wait_for_enter().context("waiting for keypress")?;
    }

    Ok(())
}

fn wait_for_enter() -> io::Result<()> {
    print!("Press Enter to exit...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
