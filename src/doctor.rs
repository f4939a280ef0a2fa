use std::process::Command;

use serde::Serialize;

use crate::engine::complexity::ComplexityEvaluator;
use crate::language::LangId;

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub version: String,
    pub git: GitStatus,
    pub complexity: Vec<StrategyStatus>,
}

#[derive(Debug, Serialize)]
pub struct GitStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StrategyStatus {
    pub language: LangId,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_version: Option<String>,
}

/// Run the doctor check: git on PATH and every registered complexity grammar.
pub fn run_doctor() -> DoctorReport {
    let evaluator = ComplexityEvaluator::with_defaults(".");
    let complexity = evaluator
        .languages()
        .into_iter()
        .map(|lang| {
            let available = check_language(lang);
            StrategyStatus {
                language: lang,
                available,
                parser_version: available.then(|| lang.ts_language().abi_version().to_string()),
            }
        })
        .collect();

    DoctorReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: check_git(),
        complexity,
    }
}

fn check_git() -> GitStatus {
    match Command::new("git").arg("--version").output() {
        Ok(out) if out.status.success() => GitStatus {
            available: true,
            version: Some(String::from_utf8_lossy(&out.stdout).trim().to_string()),
        },
        _ => GitStatus {
            available: false,
            version: None,
        },
    }
}

fn check_language(lang: LangId) -> bool {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&lang.ts_language()).is_ok()
}
