//! Interactive terminal viewer for OBJ models.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use termraster::canvas::TermCanvas;
use termraster::math::Vec3;
use termraster::obj;
use termraster::object::{Actions, Camera, Light, Material, Model, Object};
use termraster::render::{Mode, Renderer};
use termraster::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Blinn-Phong lighting
    Phong,
    /// View-space depth as gray
    Depth,
    /// Wireframe edges
    Wireframe,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Mode {
        match mode {
            ModeArg::Phong => Mode::PhongShading,
            ModeArg::Depth => Mode::ZColoring,
            ModeArg::Wireframe => Mode::Framework,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "termraster", version, about = "Render an OBJ model in the terminal")]
struct Args {
    /// Path to the OBJ model to render
    model: PathBuf,

    /// Character columns (defaults to the terminal width)
    #[arg(long)]
    cols: Option<usize>,

    /// Character rows (defaults to the terminal height)
    #[arg(long)]
    rows: Option<usize>,

    /// Horizontal super-sampling: pixels per character cell
    #[arg(long, default_value_t = 4)]
    cell_width: usize,

    /// Vertical super-sampling: pixels per character cell
    #[arg(long, default_value_t = 8)]
    cell_height: usize,

    /// Worker threads (defaults to the CPU count, clamped to [1, 16])
    #[arg(long)]
    threads: Option<usize>,

    /// Initial shading mode
    #[arg(long, value_enum, default_value_t = ModeArg::Phong)]
    mode: ModeArg,

    /// Disable backface culling
    #[arg(long)]
    no_backface_culling: bool,

    /// Vertical field of view in radians
    #[arg(long, default_value_t = 0.4 * std::f32::consts::PI, allow_negative_numbers = true)]
    fov: f32,

    /// Near clip plane (negative; the camera looks toward -z)
    #[arg(long, default_value_t = -0.1, allow_negative_numbers = true)]
    z_near: f32,

    /// Far clip plane (negative)
    #[arg(long, default_value_t = -50.0, allow_negative_numbers = true)]
    z_far: f32,

    /// Hold the model still instead of spinning it
    #[arg(long)]
    no_spin: bool,
}

/// Keys held down are invisible to a terminal, so a pressed key arms its
/// action for exactly one tick and the tick clears all camera actions.
const KEY_ACTIONS: [(KeyCode, Actions); 10] = [
    (KeyCode::Char('w'), Actions::MOVE_FORWARD),
    (KeyCode::Char('a'), Actions::MOVE_LEFT),
    (KeyCode::Char('s'), Actions::MOVE_BACK),
    (KeyCode::Char('d'), Actions::MOVE_RIGHT),
    (KeyCode::Char(' '), Actions::MOVE_UP),
    (KeyCode::Char('x'), Actions::MOVE_DOWN),
    (KeyCode::Up, Actions::TURN_UP),
    (KeyCode::Left, Actions::TURN_LEFT),
    (KeyCode::Down, Actions::TURN_DOWN),
    (KeyCode::Right, Actions::TURN_RIGHT),
];

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_file = tracing_appender::rolling::never(".", "termraster.log");
    let (log_writer, _log_guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(log_writer)
        .with_ansi(false)
        .init();

    let mesh = obj::load_obj(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;

    let (term_cols, term_rows) = terminal::size().context("querying terminal size")?;
    let cols = args.cols.unwrap_or(term_cols as usize).max(1);
    let rows = args.rows.unwrap_or(term_rows as usize).max(1);

    let threads = args
        .threads
        .unwrap_or_else(num_cpus::get)
        .clamp(1, 16);

    let canvas = TermCanvas::new(cols, rows, args.cell_width, args.cell_height);
    let aspect = canvas.width() as f32 / canvas.height() as f32;

    info!(
        cols,
        rows,
        pixel_width = canvas.width(),
        pixel_height = canvas.height(),
        threads,
        "starting viewer"
    );

    let camera = Camera::new(
        Object::new(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::y(),
            2.0,
            std::f32::consts::FRAC_PI_2,
        ),
        args.fov,
        aspect,
        args.z_near,
        args.z_far,
    );

    let mut model_pose = Object::new(
        Vec3::zeros(),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::y(),
        0.0,
        std::f32::consts::FRAC_PI_3,
    );
    if !args.no_spin {
        model_pose.set_action(Actions::TURN_LEFT, true);
    }
    let model = Model::new(
        model_pose,
        mesh,
        Material {
            ka: Vec3::new(0.005, 0.005, 0.005),
            kd: Vec3::new(0.8, 0.86, 0.88),
            ks: Vec3::new(0.4, 0.4, 0.4),
        },
    );

    let lights = vec![
        Light {
            w_pos: Vec3::new(0.0, 15.0, 0.0),
            intensity: Vec3::new(500.0, 500.0, 500.0),
        },
        Light {
            w_pos: Vec3::new(10.0, -3.0, 10.0),
            intensity: Vec3::new(100.0, 100.0, 100.0),
        },
    ];
    let ambient_light = Vec3::new(5.0, 5.0, 5.0);

    let renderer = Renderer::new(threads, !args.no_backface_culling, Vec3::zeros());

    let _guard = RawModeGuard::enter()?;
    run_loop(args.mode.into(), canvas, renderer, camera, model, lights, ambient_light)
}

fn run_loop(
    mut mode: Mode,
    mut canvas: TermCanvas,
    mut renderer: Renderer,
    mut camera: Camera,
    mut model: Model,
    lights: Vec<Light>,
    ambient_light: Vec3,
) -> anyhow::Result<()> {
    let mut out = io::stdout();

    let mut show_info = true;
    let mut fps = 0u32;
    let mut frame_count = 0u32;
    let mut fps_window = Instant::now();
    let mut last_tick = Instant::now();

    loop {
        // 1. input
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('1') => mode = Mode::PhongShading,
                    KeyCode::Char('2') => mode = Mode::ZColoring,
                    KeyCode::Char('3') => mode = Mode::Framework,
                    KeyCode::Char('b') => renderer.backface_culling = !renderer.backface_culling,
                    KeyCode::Char('f') => show_info = !show_info,
                    code => {
                        for (key_code, action) in KEY_ACTIONS {
                            if code == key_code {
                                camera.pose.set_action(action, true);
                            }
                        }
                    }
                }
            }
        }

        // 2. render the frame
        renderer.draw(&canvas, &camera, &model, &lights, ambient_light, mode);

        // 3. frame rate over 500 ms windows
        frame_count += 1;
        if fps_window.elapsed() >= Duration::from_millis(500) {
            fps = 2 * frame_count;
            frame_count = 0;
            fps_window = Instant::now();
        }

        // 4. blend pixels to characters and present
        canvas.blend();
        canvas.blend_overlay(&hud(fps, mode, &renderer, &camera, &model, show_info));
        canvas.display(&mut out)?;

        // 5. advance poses
        let dt = last_tick.elapsed().as_secs_f32();
        last_tick = Instant::now();
        camera.pose.update_attitude(dt);
        model.pose.update_attitude(dt);
        camera.pose.actions = Actions::empty();
    }
}

fn hud(
    fps: u32,
    mode: Mode,
    renderer: &Renderer,
    camera: &Camera,
    model: &Model,
    show_info: bool,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "fps: {fps}");
    let _ = writeln!(text, "[ F ] {} info", if show_info { "hide" } else { "show" });
    if !show_info {
        return text;
    }

    let mode_name = match mode {
        Mode::PhongShading => "1.Blinn-Phong shading",
        Mode::ZColoring => "2.depth",
        Mode::Framework => "3.wireframe",
    };
    let _ = writeln!(text, "[ W/A/S/D/DIR ] move camera");
    let _ = writeln!(text, "color mode: {mode_name} [ 1/2/3 ]");
    let _ = writeln!(
        text,
        "backface culling: {} [ B ]",
        if renderer.backface_culling { "enabled" } else { "disabled" }
    );
    text.push_str(&camera.debug_info());
    text.push_str(&model.debug_info());
    text
}

/// Puts the terminal into raw mode on an alternate screen and restores
/// it on drop, so a panic cannot leave the shell unusable.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> anyhow::Result<RawModeGuard> {
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide
        )
        .context("entering alternate screen")?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
