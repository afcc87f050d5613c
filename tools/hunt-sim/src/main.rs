use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;

use spook_hunt_core::field::geodesy;
use spook_hunt_core::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "hunt-sim",
    author,
    version,
    about = "Scripted walk-through of a spook hunt session",
    long_about = "Drives a full hunt against the real game core with a scripted GPS \
                  track and an injected clock: approach the zone, enter, capture a \
                  pack of ghosts, then bank them at the containment checkpoint.\n\n\
                  Every externally visible state change is printed from the session's \
                  event stream, so the output doubles as a readable trace of the rules."
)]
struct Args {
    /// Session RNG seed; the same seed replays the same hunt
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Game config JSON; defaults to the built-in Florianópolis deployment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite state file; state is kept in memory when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// Sign in as this player before hunting
    #[arg(long)]
    owner: Option<String>,

    /// Capture attempts before heading to the checkpoint
    #[arg(long, default_value_t = 12)]
    captures: usize,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose {
            "hunt_sim=debug,spook_hunt_core=debug"
        } else {
            "hunt_sim=info,spook_hunt_core=warn"
        })
        .init();

    info!("=== Spook Hunt Simulator ===");

    let cfg = match &args.config {
        Some(path) => {
            info!("Config: {}", path.display());
            GameConfig::from_path(path)?
        }
        None => GameConfig::default(),
    };
    let token = cfg
        .checkpoints
        .first()
        .map(|cp| cp.token.clone())
        .context("config has no checkpoints")?;
    let center = cfg.zone.center();
    let hold = cfg.capture.duration();

    let (store, sqlite): (Arc<dyn StateStore>, Option<Arc<SqliteStore>>) = match &args.db {
        Some(path) => {
            info!("State db: {}", path.display());
            let store = Arc::new(SqliteStore::open(path)?);
            (store.clone(), Some(store))
        }
        None => (Arc::new(MemoryStore::default()), None),
    };
    let sync: Arc<dyn SyncBackend> = match cfg.sync.base_url.as_deref() {
        Some(base) => {
            info!("Sync: {base}");
            Arc::new(HttpSync::new(base))
        }
        None => Arc::new(NullSync),
    };

    let mut session = HuntSession::new(cfg, store, sync)?.with_rng_seed(args.seed);
    let mut events = session.subscribe();
    if let Some(owner) = &args.owner {
        session.login(OwnerKey::new(owner)).await;
        info!("Signed in as {owner}");
    }
    session.start();

    let mut now = Utc::now();

    info!("");
    info!("Phase 1: Approaching from outside the zone...");
    session.apply_fix(fix_at(&session, 150.0, 225.0, now));
    let hud = session.hud(now);
    info!(
        "  HUD: {} to the hunt area",
        hud.range_text.as_deref().unwrap_or("?")
    );
    print_events(&mut events);

    info!("");
    info!("Phase 2: Entering the zone...");
    now += chrono::Duration::seconds(30);
    session.apply_fix(PositionFix {
        point: center,
        accuracy_m: 5.0,
        timestamp: now,
    });
    print_events(&mut events);

    info!("");
    info!("Phase 3: Hunting ({} attempts)...", args.captures);
    for _ in 0..args.captures {
        session.respawn_tick(now).await;
        match session.fire_pressed(now) {
            BeginOutcome::Started { .. } => {}
            other => {
                info!("  no capture possible: {other:?}");
                break;
            }
        }
        now += hold;
        session.capture_tick(now).await;
        print_events(&mut events);
    }
    let hud = session.hud(now);
    info!("  Pack: {}/{} ghosts", hud.inventory_len, hud.inventory_capacity);

    if let Some(store) = &sqlite {
        info!("");
        info!("Pack manifest from the state db:");
        for (kind, count) in store.kind_counts(session.owner()).await? {
            info!("  {count} {kind} ghost(s)");
        }
    }

    info!("");
    info!("Phase 4: Banking at the checkpoint...");
    now += chrono::Duration::seconds(60);
    let rejected = session.scan_token("GHOST_TRAP_LAB_003", now).await?;
    info!("  scanned a stray QR code: {rejected:?}");
    match session.scan_token(&token, now).await? {
        DepositOutcome::Completed { receipt, .. } => {
            info!(
                "  receipt: {} ghosts, {} points ({} bonus)",
                receipt.ghost_count, receipt.total_points, receipt.bonus_points
            );
        }
        other => info!("  deposit did not complete: {other:?}"),
    }
    print_events(&mut events);

    info!("");
    info!("Phase 5: Wrapping up...");
    session.stop().await;
    print_events(&mut events);
    let hud = session.hud(now);
    info!(
        "Final: level {} with {} points, {} ghosts deposited",
        hud.level, hud.points, hud.ghosts_deposited
    );

    Ok(())
}

/// A fix placed `distance_m` out from the zone center along `bearing`.
fn fix_at(
    session: &HuntSession,
    distance_m: f64,
    bearing: f64,
    now: chrono::DateTime<Utc>,
) -> PositionFix {
    PositionFix {
        point: geodesy::destination(session.config().zone.center(), bearing, distance_m),
        accuracy_m: 5.0,
        timestamp: now,
    }
}

fn print_events(rx: &mut broadcast::Receiver<GameEvent>) {
    while let Ok(event) = rx.try_recv() {
        info!("  {}", describe(&event));
    }
}

fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::ZoneEntered { distance_m } => {
            format!("entered the hunt zone ({distance_m:.0}m from center)")
        }
        GameEvent::ZoneExited { distance_m } => {
            format!("left the hunt zone ({distance_m:.0}m from center)")
        }
        GameEvent::MembershipLost => "position lost; membership unknown".into(),
        GameEvent::GhostSpawned { id, kind, local } => format!(
            "{kind} ghost {id} appeared at ({:.1}, {:.1}, {:.1})",
            local.x, local.y, local.z
        ),
        GameEvent::GhostDespawned { id, reason } => format!("ghost {id} despawned ({reason})"),
        GameEvent::CaptureStarted { target } => format!("charging on {target}"),
        GameEvent::CaptureProgress { fraction, .. } => {
            format!("charge at {:.0}%", fraction * 100.0)
        }
        GameEvent::CaptureResolved { outcome } => match outcome {
            CaptureOutcome::Success { target, points } => {
                format!("captured {target} (+{points} pts in the pack)")
            }
            CaptureOutcome::Failed { target } => format!("capture of {target} failed"),
            CaptureOutcome::Cancelled { target } => format!("capture of {target} cancelled"),
        },
        GameEvent::InventoryChanged { len, capacity } => format!("pack now {len}/{capacity}"),
        GameEvent::DepositCompleted { receipt } => format!(
            "deposited {} ghosts for {} points ({} bonus)",
            receipt.ghost_count, receipt.total_points, receipt.bonus_points
        ),
        GameEvent::LevelUp(up) => format!("level up: {} -> {}", up.from, up.to),
        GameEvent::MilestoneUnlocked(m) => format!("milestone unlocked: {m}"),
        GameEvent::StorageWarning { detail } => format!("storage warning: {detail}"),
        GameEvent::SyncWarning { detail } => format!("sync warning: {detail}"),
    }
}
