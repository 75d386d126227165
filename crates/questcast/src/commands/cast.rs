//! `cast` handler: pick a device and open the mirroring window.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use questcast_core::{AppConnectionState, DeviceIdentity, cast_target, probe};

use crate::cli::{CastArgs, GlobalOpts};
use crate::config::{Config, Toolset};
use crate::error::CliError;
use crate::output;

use super::{util, wireless};

/// How long `cast --wireless` waits for the handoff.
const WIRELESS_WAIT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct CastPlan {
    device: DeviceIdentity,
    command: String,
}

#[derive(Serialize)]
struct CastStarted {
    device: DeviceIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
}

pub async fn handle(
    args: CastArgs,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = resolve_target(&args, tools, cfg, global).await?;

    if args.dry_run {
        let plan = CastPlan {
            command: tools
                .mirror
                .command_line(&cfg.mirror, Some(&target.address())),
            device: target,
        };
        let out = output::render_single(
            global.output,
            &plan,
            |p| p.command.clone(),
            |p| p.command.clone(),
        )?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let session = questcast_core::launch(&tools.mirror, &cfg.mirror, &target)?;
    let started = CastStarted {
        pid: session.pid(),
        device: target,
    };
    let out = output::render_single(
        global.output,
        &started,
        |s| match s.pid {
            Some(pid) => format!("Mirroring {} (pid {pid})", s.device),
            None => format!("Mirroring {}", s.device),
        },
        |s| s.pid.map(|p| p.to_string()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);

    if args.detach {
        return Ok(());
    }

    // Closing the window normally exits non-zero, so the code is only logged.
    let code = session.wait().await?;
    tracing::debug!(?code, "mirroring window closed");
    Ok(())
}

async fn resolve_target(
    args: &CastArgs,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<DeviceIdentity, CliError> {
    if let Some(ref raw) = args.target {
        let explicit = util::parse_target(raw)?;
        return Ok(cast_target(&AppConnectionState::absent(), Some(&explicit))?);
    }
    let state = if args.wireless {
        wireless::connect(tools, cfg, global, WIRELESS_WAIT).await?
    } else {
        probe(Arc::clone(&tools.adb)).await?.0
    };
    Ok(cast_target(&state, None)?)
}
