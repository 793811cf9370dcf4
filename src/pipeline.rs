use anyhow::{Context, Result, anyhow};
use std::{fs, path::Path, sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::Instant};

use capsync::{
    config::Config,
    formats::{self, time::format_clock},
    model::{Cue, track_end},
    normalize::normalize_detailed,
    player::{
        CaptionPlayer, LoadTicket,
        fetch::HttpFetcher,
        loader::{CaptionLoader, CaptionSource, LoadOutcome, LoadState},
        media::SimulatedMedia,
        store::FileStore,
    },
};

use crate::cli::{DetectCmd, Format, NormalizeCmd, PlayCmd};

pub fn run_normalize(cmd: NormalizeCmd, cfg: &Config) -> Result<()> {
    let span = tracing::info_span!("normalize", input = cmd.input.as_str(), to = ?cmd.to);
    let _g = span.enter();

    let raw = read_input_to_string(&cmd.input)?;
    tracing::info!(bytes = raw.len(), "read input");

    let (shape, cues) = normalize_detailed(&raw, &cfg.grouping);
    tracing::info!(?shape, "payload shape detected");
    log_cue_summary(&cues, cfg);

    if cues.is_empty() {
        tracing::warn!("no captions found in input");
    }

    let rendered = render_any(&cues, cmd.to, cfg)?;

    if cmd.stdout {
        print!("{rendered}");
        tracing::info!(mode = "stdout", "wrote output");
        return Ok(());
    }

    let out_path = derive_output_path(&cmd)?;
    write_output(&out_path, &rendered, cmd.overwrite)?;
    tracing::info!(path = out_path.as_str(), "wrote output file");

    Ok(())
}

pub fn run_detect(cmd: DetectCmd, cfg: &Config) -> Result<()> {
    let raw = read_input_to_string(&cmd.input)?;
    let (shape, cues) = normalize_detailed(&raw, &cfg.grouping);
    let name = serde_json::to_value(shape)?;
    println!("shape: {}", name.as_str().unwrap_or("unrecognized"));
    println!("cues: {}", cues.len());
    if let Some(last) = cues.last() {
        println!("ends: {}", format_clock(last.end_time));
    }
    Ok(())
}

enum LoadEvent {
    Phase(LoadTicket, LoadState),
    Finished(LoadTicket, LoadOutcome),
}

pub async fn run_play(cmd: PlayCmd, cfg: &Config) -> Result<()> {
    let source = CaptionSource {
        store_key: cmd.key.clone(),
        remote_url: cmd.url.clone(),
        language: cmd.language.clone(),
    };
    if source.store_key.is_none() && source.remote_url.is_none() {
        tracing::warn!("no --key or --url given, playing without captions");
    }

    let store = Arc::new(FileStore::new(&cfg.store.dir));
    let fetcher = Arc::new(HttpFetcher::new(&cfg.fetch).context("failed creating HTTP client")?);
    let loader = CaptionLoader::new(store, fetcher)
        .with_grouping(cfg.grouping.clone())
        .with_order(cfg.player.load_order)
        .with_default_language(cfg.store.language.as_str());

    let media = SimulatedMedia::new(cmd.duration.unwrap_or(f64::INFINITY), cmd.speed);
    let mut player = CaptionPlayer::new(media, &cfg.player);
    if cmd.no_captions {
        player.toggle_captions();
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ticket = player.begin_load(source.clone());
    tokio::spawn(async move {
        let phase_tx = tx.clone();
        let outcome = loader
            .load(&source, move |state| {
                phase_tx.send(LoadEvent::Phase(ticket, state)).ok();
            })
            .await;
        tx.send(LoadEvent::Finished(ticket, outcome)).ok();
    });

    if !player.play() {
        return Err(anyhow!("playback could not start"));
    }

    let mut ticks =
        tokio::time::interval(Duration::from_millis(cfg.player.tick_interval_ms.max(1)));
    let mut stall_checks =
        tokio::time::interval(Duration::from_millis(cfg.player.stall_interval_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut shown = String::new();

    loop {
        tokio::select! {
            Some(event) = rx.recv() => match event {
                LoadEvent::Phase(t, state) => {
                    player.apply_phase(t, state);
                }
                LoadEvent::Finished(t, outcome) => {
                    if player.finish_load(t, outcome) && cmd.duration.is_none() {
                        let end = track_end(player.cues());
                        if end <= 0.0 {
                            tracing::info!("no captions and no --duration, nothing to play");
                            break;
                        }
                        player.media_mut().set_duration(end);
                    }
                }
            },
            _ = ticks.tick() => player.on_time_update(Instant::now()),
            _ = stall_checks.tick() => {
                player.check_stall(Instant::now());
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }

        let text = player.active_cue_text();
        if text != shown {
            let clock = format_clock(player.clock());
            if text.is_empty() {
                println!("[{clock}] --");
            } else {
                println!("[{clock}] {text}");
            }
            shown = text.to_string();
        }

        let settled = matches!(player.load_state(), LoadState::Ready | LoadState::Error);
        if settled && !player.is_playing() {
            break;
        }
    }

    player.pause();
    tracing::info!(
        clock = player.clock(),
        state = ?player.load_state(),
        origin = ?player.origin(),
        "playback finished"
    );
    Ok(())
}

fn read_input_to_string(input: &str) -> Result<String> {
    if input == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed reading stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(input).with_context(|| format!("failed reading input: {input}"))
    }
}

fn log_cue_summary(cues: &[Cue], cfg: &Config) {
    tracing::info!(
        cues = cues.len(),
        ends_at = track_end(cues),
        "cue summary"
    );

    if tracing::enabled!(tracing::Level::DEBUG) {
        let n = cfg.logging.debug_cue_samples.min(cues.len());
        for c in cues.iter().take(n) {
            tracing::debug!(
                seq = c.sequence_number,
                start = c.start_time,
                end = c.end_time,
                chars = c.text.chars().count(),
                "cue sample"
            );
        }
    }
}

fn render_any(cues: &[Cue], fmt: Format, cfg: &Config) -> Result<String> {
    match fmt {
        Format::Srt => Ok(formats::srt::write_srt(cues, cfg)),
        Format::Json => formats::json::write_json(cues, cfg.formats.json.pretty)
            .context("failed serializing cues as JSON"),
    }
}

fn derive_output_path(cmd: &NormalizeCmd) -> Result<String> {
    if let Some(o) = &cmd.output {
        return Ok(o.clone());
    }

    if cmd.input == "-" {
        return Err(anyhow!(
            "output path required when input is stdin and --stdout is not set"
        ));
    }

    let p = Path::new(&cmd.input);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad input filename"))?;

    let parent = p.parent().unwrap_or_else(|| Path::new("."));
    let mut out = parent.join(format!("{stem}.{}", cmd.to.extension()));
    if out == p {
        out = parent.join(format!("{stem}.normalized.{}", cmd.to.extension()));
    }
    Ok(out.to_string_lossy().to_string())
}

fn write_output(path: &str, data: &str, overwrite: bool) -> Result<()> {
    if Path::new(path).exists() && !overwrite {
        return Err(anyhow!(
            "refusing to overwrite existing file (pass --overwrite): {path}"
        ));
    }
    fs::write(path, data).with_context(|| format!("failed writing output: {path}"))?;
    Ok(())
}
