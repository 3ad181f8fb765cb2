//! Interactive host shell: loads a WAD, runs the simulation at 35 Hz and
//! blits the software renderer into a window.
//!
//! ```bash
//! cargo run --release -- doom.wad --map 0
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::{Duration, Instant};

use irondoom_rs::fixed::{FRACUNIT, Fixed};
use irondoom_rs::game::Skill;
use irondoom_rs::level::{LoadOptions, load_level};
use irondoom_rs::render::{Frame, Renderer, TextureBank};
use irondoom_rs::sim::{BT_ATTACK, BT_USE, Sim, SimOptions, TicCmd};
use irondoom_rs::sound::{NullDriver, Sounds};
use irondoom_rs::wad::Wad;

const TIC: Duration = Duration::from_micros(1_000_000 / 35);

#[derive(Parser, Debug)]
#[command(about = "Iron Doom software-renderer viewer")]
struct Args {
    /// Path to an IWAD or PWAD.
    wad: String,

    /// Map index into the WAD's marker list.
    #[arg(long, default_value_t = 0)]
    map: usize,

    /// Skill level 1-5.
    #[arg(long, default_value_t = 3)]
    skill: u8,

    /// Window width in pixels.
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Window height in pixels.
    #[arg(long, default_value_t = 400)]
    height: usize,

    /// Render each simulation tic exactly once.
    #[arg(long)]
    capped: bool,

    /// Halve horizontal resolution, classic low detail.
    #[arg(long)]
    low_detail: bool,
}

fn build_cmd(win: &Window) -> TicCmd {
    let mut cmd = TicCmd::default();

    if win.is_key_down(Key::W) || win.is_key_down(Key::Up) {
        cmd.forwardmove = 50;
    }
    if win.is_key_down(Key::S) || win.is_key_down(Key::Down) {
        cmd.forwardmove = -50;
    }
    if win.is_key_down(Key::A) {
        cmd.sidemove = -40;
    }
    if win.is_key_down(Key::D) {
        cmd.sidemove = 40;
    }
    if win.is_key_down(Key::Left) {
        cmd.angleturn = 640;
    }
    if win.is_key_down(Key::Right) {
        cmd.angleturn = -640;
    }
    if win.is_key_down(Key::LeftCtrl) || win.is_key_down(Key::RightCtrl) {
        cmd.buttons |= BT_ATTACK;
    }
    if win.is_key_pressed(Key::Space, KeyRepeat::No) {
        cmd.buttons |= BT_USE;
    }
    cmd
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let wad = Wad::from_file(&args.wad).with_context(|| format!("opening {}", args.wad))?;
    let markers = wad.level_indices();
    if args.map >= markers.len() {
        bail!("map index {} out of range ({} maps)", args.map, markers.len());
    }

    let bank = TextureBank::from_wad(&wad).context("decoding graphics")?;
    let level = load_level(&wad, markers[args.map], &bank, &LoadOptions::default())
        .context("loading map")?;
    println!("{}: {} things, {} sectors", level.name, level.things.len(), level.sectors.len());

    let skill = match args.skill {
        1 => Skill::Baby,
        2 => Skill::Easy,
        3 => Skill::Medium,
        4 => Skill::Hard,
        _ => Skill::Nightmare,
    };
    let mut sim = Sim::new(
        &level,
        SimOptions {
            skill,
            respawn_monsters: skill == Skill::Nightmare,
            ..SimOptions::default()
        },
    );
    sim.spawn_map_things(&level);

    let mut snd = Sounds::new(
        Box::new(NullDriver::default()),
        Box::new(NullDriver::default()),
        8,
    );

    let mut renderer = Renderer::new(args.width, args.height);
    renderer.opts.uncapped = !args.capped;
    if args.low_detail {
        renderer.set_view_size(11, 1);
    }

    let mut win = Window::new(
        "Iron Doom",
        args.width,
        args.height,
        WindowOptions::default(),
    )?;

    /* ── fixed-rate simulation, free-rate rendering ─────────────────── */
    let mut last_tic = Instant::now();
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let cmd = build_cmd(&win);

        while last_tic.elapsed() >= TIC {
            sim.ticker(&level, &[cmd]);
            snd.run_queue(&mut sim, &level);
            snd.update_sounds(&sim, &level);
            last_tic += TIC;
        }

        // sub-tic progress for interpolation
        let fractionaltic: Fixed = if args.capped {
            FRACUNIT
        } else {
            ((last_tic.elapsed().as_micros() as i64 * FRACUNIT as i64)
                / TIC.as_micros() as i64)
                .clamp(0, FRACUNIT as i64) as Fixed
        };

        let t0 = Instant::now();
        let frame = Frame {
            level: &level,
            bank: &bank,
            sim: &sim,
        };
        renderer.render_player_view(&frame, 0, fractionaltic);
        acc_time += t0.elapsed();
        acc_frames += 1;

        win.update_with_buffer(renderer.framebuffer(), args.width, args.height)?;

        if last_print.elapsed() >= Duration::from_secs(3) && acc_frames > 0 {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            println!("avg render: {avg_ms:.2} ms  ({:.1} FPS)", 1000.0 / avg_ms);
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
