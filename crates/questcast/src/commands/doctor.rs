//! `doctor` handler: check the tools, the config file, and the headset.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use questcast_core::{PollFault, PollHealth, StatusView, probe};

use crate::cli::GlobalOpts;
use crate::config::{self, Config, Toolset};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Verdict {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    verdict: Verdict,
    detail: String,
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "")]
    mark: &'static str,
    #[tabled(rename = "Check")]
    name: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&Check> for CheckRow {
    fn from(c: &Check) -> Self {
        Self {
            mark: match c.verdict {
                Verdict::Ok => "ok",
                Verdict::Warn => "warn",
                Verdict::Fail => "FAIL",
            },
            name: c.name,
            detail: c.detail.clone(),
        }
    }
}

pub async fn handle(tools: &Toolset, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let mut checks = Vec::new();
    let mut missing: Option<CliError> = None;

    // adb
    let adb_ok = match tools.adb.version().await {
        Ok(version) => {
            checks.push(Check {
                name: "adb",
                verdict: Verdict::Ok,
                detail: format!("{version} ({})", tools.adb.tool().path().display()),
            });
            true
        }
        Err(err) => {
            checks.push(Check {
                name: "adb",
                verdict: Verdict::Fail,
                detail: err.to_string(),
            });
            if err.is_tool_not_found() {
                missing = Some(err.into());
            }
            false
        }
    };

    // scrcpy
    match tools.mirror.version(cfg.adb_timeout()).await {
        Ok(version) => checks.push(Check {
            name: "scrcpy",
            verdict: Verdict::Ok,
            detail: format!("{version} ({})", tools.mirror.tool().path().display()),
        }),
        Err(err) => {
            checks.push(Check {
                name: "scrcpy",
                verdict: Verdict::Fail,
                detail: err.to_string(),
            });
            if err.is_tool_not_found() && missing.is_none() {
                missing = Some(err.into());
            }
        }
    }

    // config file
    let path = config::config_file(global);
    checks.push(Check {
        name: "config",
        verdict: Verdict::Ok,
        detail: if path.exists() {
            path.display().to_string()
        } else {
            format!("{} (not found, using defaults)", path.display())
        },
    });

    // headset
    if adb_ok {
        checks.push(match probe(Arc::clone(&tools.adb)).await {
            Ok((_, snapshot)) if snapshot.fault == Some(PollFault::Timeout) => Check {
                name: "headset",
                verdict: Verdict::Warn,
                detail: "adb devices timed out".into(),
            },
            Ok((state, _)) => {
                let view = StatusView::new(&state, &PollHealth::Ok);
                Check {
                    name: "headset",
                    verdict: if view.can_cast {
                        Verdict::Ok
                    } else {
                        Verdict::Warn
                    },
                    detail: match view.device {
                        Some(device) => format!("{} ({device})", view.headline),
                        None => view.headline,
                    },
                }
            }
            Err(err) => Check {
                name: "headset",
                verdict: Verdict::Fail,
                detail: err.to_string(),
            },
        });
    }

    let out = output::render_list(global.output, &checks, |c| CheckRow::from(c), |c| {
        format!("{}\t{:?}", c.name, c.verdict).to_lowercase()
    })?;
    output::print_output(&out, global.quiet);

    match missing {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
