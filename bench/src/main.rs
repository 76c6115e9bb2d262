use std::time::{Duration, Instant};

use serde_json::json;
use sha2::Digest as _;
use zonelight::{
    BackendKind, BezPath, Brush, Canvas, CanvasBackend, CanvasSettings, ClipMask, Color, Ellipse,
    IntRect, Line, LinearGradient, Point, Rect, Reducer, SamplerSettings, Zone, ZoneId, ZoneMap,
    ZoneSampler,
};

#[derive(Clone, Debug)]
struct BenchArgs {
    backend: BackendKind,
    cols: u32,
    rows: u32,
    key_px: u32,
    frames: u32,
    warmup: u32,
    repeats: u32,
    force_scalar: bool,
    json: bool,
}

#[derive(Clone, Debug, Default)]
struct RunMetrics {
    canvas_create: Duration,
    draw_total: Duration,
    sample_total: Duration,
    wall_total: Duration,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.cols == 0 || args.rows == 0 || args.key_px == 0 {
        anyhow::bail!("--cols/--rows/--key-px must be > 0");
    }
    if args.frames == 0 || args.repeats == 0 {
        anyhow::bail!("--frames and --repeats must be > 0");
    }

    let zones = keyboard_grid(args.cols, args.rows, args.key_px)?;
    let settings = SamplerSettings {
        backend: args.backend,
        force_scalar: args.force_scalar,
        ..SamplerSettings::default()
    };

    if args.warmup > 0 {
        eprintln!("warmup: {} run(s)", args.warmup);
        for _ in 0..args.warmup {
            run_once(&args, &zones, &settings)?;
        }
    }

    eprintln!(
        "bench: {repeats} run(s) ({profile} build), {frames} frames/run, {zones} zones, canvas={w}x{h}, backend={backend:?}, reducer={reducer:?}",
        repeats = args.repeats,
        profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        frames = args.frames,
        zones = zones.len(),
        w = args.cols * args.key_px,
        h = args.rows * args.key_px,
        backend = args.backend,
        reducer = settings.reducer(),
    );

    let mut runs = Vec::<RunMetrics>::with_capacity(args.repeats as usize);
    let mut digest = String::new();
    for i in 0..args.repeats {
        let (m, d) = run_once(&args, &zones, &settings)?;
        eprintln!(
            "run {i:03}: wall={wall:.3}s draw={draw:.3}s sample={sample:.3}s digest={short}",
            wall = m.wall_total.as_secs_f64(),
            draw = m.draw_total.as_secs_f64(),
            sample = m.sample_total.as_secs_f64(),
            short = &d[..12],
        );
        if !digest.is_empty() && digest != d {
            anyhow::bail!("zone colours differ between runs ({digest} vs {d})");
        }
        digest = d;
        runs.push(m);
    }

    report_percentiles(&runs);
    if args.json {
        let per_frame = |f: fn(&RunMetrics) -> Duration| {
            let total: Duration = runs.iter().map(f).sum();
            total.as_secs_f64() * 1e6 / f64::from(args.frames * args.repeats)
        };
        println!(
            "{}",
            json!({
                "backend": format!("{:?}", args.backend),
                "reducer": format!("{:?}", settings.reducer()),
                "zones": zones.len(),
                "frames": args.frames,
                "repeats": args.repeats,
                "draw_us_per_frame": per_frame(|m| m.draw_total),
                "sample_us_per_frame": per_frame(|m| m.sample_total),
                "colour_sha256": digest,
            })
        );
    }
    Ok(())
}

fn keyboard_grid(cols: u32, rows: u32, key_px: u32) -> anyhow::Result<ZoneMap> {
    let mut zones = Vec::with_capacity((cols * rows) as usize);
    for r in 0..rows {
        for c in 0..cols {
            zones.push(Zone {
                id: ZoneId(r * cols + c),
                rect: IntRect::new((c * key_px) as i32, (r * key_px) as i32, key_px, key_px),
            });
        }
    }
    Ok(ZoneMap::from_zones(zones)?)
}

/// One frame of a typical effect stack: a moving gradient wave, a pulse ring, a sweep line and
/// a masked-out key cluster.
fn draw_frame(canvas: &mut Canvas, frame: u32, key_px: u32) {
    let w = f64::from(canvas.width());
    let h = f64::from(canvas.height());
    let t = f64::from(frame);

    canvas.clear();
    let phase = (t * 3.0) % w;
    canvas.fill_rect(
        &Brush::Linear(LinearGradient {
            start: Point::new(phase - w, 0.0),
            end: Point::new(phase, h),
            start_color: Color::opaque(255, 0, 80),
            end_color: Color::opaque(0, 120, 255),
        }),
        Rect::new(0.0, 0.0, w, h),
    );

    let radius = 4.0 + (t * 0.7) % (w / 2.0);
    canvas.fill_ellipse(
        &Brush::Solid(Color::from_rgba8(255, 255, 255, 96)),
        Ellipse::new((w / 2.0, h / 2.0), (radius, radius * 0.6), 0.0),
    );

    let x = (t * 5.0) % w;
    canvas.draw_line(
        &Brush::Solid(Color::opaque(255, 200, 0)),
        Line::new((x, 0.0), (x, h)),
        f64::from(key_px) * 0.5,
    );

    let mut tri = BezPath::new();
    tri.move_to((0.0, h));
    tri.line_to((w * 0.2, h * 0.4));
    tri.line_to((w * 0.4, h));
    tri.close_path();
    canvas.fill_path(&Brush::Solid(Color::from_rgba8(20, 255, 40, 160)), &tri);

    let k = key_px as i32;
    canvas.exclude_region(&ClipMask::rects([
        IntRect::new(0, 0, key_px * 2, key_px),
        IntRect::new(k * 3, k, key_px, key_px),
    ]));
}

fn run_once(
    args: &BenchArgs,
    zones: &ZoneMap,
    settings: &SamplerSettings,
) -> anyhow::Result<(RunMetrics, String)> {
    let wall = Instant::now();

    let t0 = Instant::now();
    let mut canvas = Canvas::new(
        args.backend,
        args.cols * args.key_px,
        args.rows * args.key_px,
        &CanvasSettings::default(),
    )?;
    let mut sampler = ZoneSampler::new(settings);
    let mut m = RunMetrics {
        canvas_create: t0.elapsed(),
        ..RunMetrics::default()
    };

    let mut hasher = sha2::Sha256::new();
    for frame in 0..args.frames {
        let t1 = Instant::now();
        draw_frame(&mut canvas, frame, args.key_px);
        m.draw_total += t1.elapsed();

        let t2 = Instant::now();
        let colors = sampler.sample(&mut canvas, zones)?;
        m.sample_total += t2.elapsed();

        for (id, c) in colors.iter() {
            hasher.update(id.0.to_le_bytes());
            hasher.update(c.to_array());
        }
    }

    m.wall_total = wall.elapsed();
    Ok((m, hex(&hasher.finalize())))
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        backend: BackendKind::Raster,
        cols: 22,
        rows: 6,
        key_px: 8,
        frames: 600,
        warmup: 1,
        repeats: 20,
        force_scalar: false,
        json: false,
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--cols" => out.cols = parse_u32(args.next(), "--cols")?,
            "--rows" => out.rows = parse_u32(args.next(), "--rows")?,
            "--key-px" => out.key_px = parse_u32(args.next(), "--key-px")?,
            "--frames" => out.frames = parse_u32(args.next(), "--frames")?,
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--backend" => {
                let v = args.next().ok_or_else(|| {
                    anyhow::anyhow!("missing value for --backend (raster|vector|gpu)")
                })?;
                out.backend = match v.as_str() {
                    "raster" => BackendKind::Raster,
                    "vector" => BackendKind::Vector,
                    "gpu" => BackendKind::Gpu,
                    _ => anyhow::bail!("unknown --backend '{v}' (expected raster|vector|gpu)"),
                };
            }
            "--scalar" => out.force_scalar = true,
            "--json" => out.json = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"zonelight-bench

Draws an animated effect stack on a keyboard-shaped canvas and samples every key each frame.
Reports p50/p90/p99 per stage and a SHA-256 of all sampled colours.

Usage:
  cargo run -q --release
  cargo run -q --release -- --backend vector --frames 1200
  cargo run -q --release --features gpu -- --backend gpu

Args:
  --backend B      raster|vector|gpu (default raster)
  --cols N         keys per row (default 22)
  --rows N         key rows (default 6)
  --key-px N       key size in pixels (default 8)
  --frames N       frames per run (default 600)
  --warmup N       (default 1)
  --repeats N      (default 20)
  --scalar         force the scalar reducer (AVX2 is used when available: {avx2})
  --json           print a JSON summary on stdout
"#,
        avx2 = Reducer::Avx2.is_supported(),
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .map_err(|_| anyhow::anyhow!("invalid value for {flag}: '{v}'"))
}

fn report_percentiles(runs: &[RunMetrics]) {
    type Getter = fn(&RunMetrics) -> Duration;
    type Field = (&'static str, Getter);

    fn collect(runs: &[RunMetrics], f: fn(&RunMetrics) -> Duration) -> Vec<Duration> {
        let mut v = runs.iter().map(f).collect::<Vec<_>>();
        v.sort_by_key(|d| d.as_nanos());
        v
    }

    fn p(v: &[Duration], p: f64) -> Duration {
        if v.is_empty() {
            return Duration::ZERO;
        }
        let n = v.len();
        let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
        v[rank - 1]
    }

    fn fmt_ms(d: Duration) -> String {
        format!("{:.3}ms", d.as_secs_f64() * 1000.0)
    }

    let fields: &[Field] = &[
        ("canvas_create", |m| m.canvas_create),
        ("draw_total", |m| m.draw_total),
        ("sample_total", |m| m.sample_total),
        ("wall_total", |m| m.wall_total),
    ];

    eprintln!("\npercentiles across runs (p50/p90/p99):");
    for (name, getter) in fields {
        let v = collect(runs, *getter);
        eprintln!(
            "  {name:14} p50={p50:>10}  p90={p90:>10}  p99={p99:>10}",
            name = *name,
            p50 = fmt_ms(p(&v, 0.50)),
            p90 = fmt_ms(p(&v, 0.90)),
            p99 = fmt_ms(p(&v, 0.99))
        );
    }
}
