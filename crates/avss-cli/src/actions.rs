use crate::opts::RunOpts;
use avss_core::{primitives::Behavior, run_local, Config};

use anyhow::{bail, Context, Result};
use std::{fs::File, io::Write};
use threshold_primitives::group::Curve;
use tracing::info;

/// Builds the configuration from the optional JSON file and the flags, flags
/// taking precedence
pub fn load_config(opts: &RunOpts) -> Result<Config> {
    let mut config = match &opts.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("could not open {}", path))?;
            serde_json::from_reader(file).with_context(|| format!("invalid config in {}", path))?
        }
        None => match (opts.n, opts.k, opts.f) {
            (Some(n), Some(k), Some(f)) => Config::new(n, k, f),
            _ => bail!("either --config or all of -n, -k and -f must be provided"),
        },
    };

    if let Some(n) = opts.n {
        config.n = n;
    }
    if let Some(k) = opts.k {
        config.k = k;
    }
    if let Some(f) = opts.f {
        config.f = f;
    }
    if let Some(timeout_ms) = opts.timeout_ms {
        config.wait_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

/// Returns the behavior of every shareholder
pub fn behaviors(opts: &RunOpts, n: usize) -> Result<Vec<Behavior>> {
    let mut behaviors = vec![Behavior::Honest; n];
    let faulty = opts
        .silent
        .iter()
        .map(|&i| (i, Behavior::Silent))
        .chain(opts.omit_blinding.iter().map(|&i| (i, Behavior::OmitBlinding)))
        .chain(
            opts.withhold
                .iter()
                .map(|&i| (i, Behavior::WithholdContribution)),
        );

    for (index, behavior) in faulty {
        let slot = match behaviors.get_mut(index as usize) {
            Some(slot) => slot,
            None => bail!("shareholder {} does not exist, n = {}", index, n),
        };
        if *slot != Behavior::Honest && *slot != behavior {
            bail!("shareholder {} cannot be both {:?} and {:?}", index, slot, behavior);
        }
        *slot = behavior;
    }

    Ok(behaviors)
}

pub fn run<C: Curve>(opts: RunOpts) -> Result<()> {
    let config = load_config(&opts)?;
    let behaviors = behaviors(&opts, config.n)?;

    let summary = run_local::<C>(&config, &behaviors)?;
    info!(public_key = %summary.public_key, "DKG completed");

    if let Some(path) = opts.output {
        let f = File::create(path)?;
        serde_json::to_writer_pretty(&f, &summary)?;
    } else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &summary)?;
        writeln!(out)?;
    }

    Ok(())
}
