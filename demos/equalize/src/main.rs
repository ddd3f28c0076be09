use argh::FromArgs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use histeq::{
    device::{Device, ExecutionStrategy},
    image::{Image, ImageSize},
    EqualizeConfig, Equalization, HistogramEqualizer, HistogramStrategy, RemapSource,
    ScanStrategy, StageTiming,
};

#[derive(FromArgs)]
/// Equalize a synthetic low-contrast image and print the pipeline tables
struct Args {
    /// image width (default: 640)
    #[argh(option, default = "640")]
    width: usize,

    /// image height (default: 480)
    #[argh(option, default = "480")]
    height: usize,

    /// number of bins, a divisor of 256 (default: 256)
    #[argh(option, short = 'b', default = "256")]
    bins: usize,

    /// histogram strategy: naive, partitioned (default: partitioned)
    #[argh(option, default = "HistogramStrategy::Partitioned")]
    histogram: HistogramStrategy,

    /// scan strategy: inclusive, exclusive (default: inclusive)
    #[argh(option, default = "ScanStrategy::Inclusive")]
    scan: ScanStrategy,

    /// remap source: original, luma (default: original)
    #[argh(option, default = "RemapSource::Original")]
    remap: RemapSource,

    /// work group size of the group kernels
    #[argh(option, short = 'g')]
    group_size: Option<usize>,

    /// run on a dedicated pool with this many threads
    #[argh(option, short = 't')]
    threads: Option<usize>,

    /// synthesize a colour image instead of a grey one
    #[argh(switch, short = 'c')]
    colour: bool,

    /// print the report as json
    #[argh(switch)]
    json: bool,

    /// seed of the synthetic image (default: 42)
    #[argh(option, default = "42")]
    seed: u64,
}

#[derive(Serialize)]
struct Report<'a> {
    config: &'a EqualizeConfig,
    width: usize,
    height: usize,
    channels: usize,
    input_range: (u8, u8),
    output_range: (u8, u8),
    histogram: &'a [u32],
    cumulative: &'a [u32],
    lut: &'a [u32],
    timings: &'a [StageTiming],
}

/// A horizontal gradient squeezed into `[96, 160)` with some noise.
fn synthesize<const C: usize>(
    size: ImageSize,
    seed: u64,
) -> Result<Image<u8, C>, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size.area() * C);
    for _ in 0..size.height {
        for x in 0..size.width {
            let base = 96 + (x * 48) / size.width.max(1);
            for _ in 0..C {
                data.push((base + rng.random_range(0..16)) as u8);
            }
        }
    }
    Ok(Image::new(size, data)?)
}

fn range(data: &[u8]) -> (u8, u8) {
    let min = data.iter().copied().min().unwrap_or(0);
    let max = data.iter().copied().max().unwrap_or(0);
    (min, max)
}

fn run<const C: usize>(
    args: &Args,
    config: EqualizeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = ImageSize {
        width: args.width,
        height: args.height,
    };
    let image = synthesize::<C>(size, args.seed)?;

    let equalizer = HistogramEqualizer::new(Device::cpu(), config)?;
    let result: Equalization<C> = equalizer.equalize(&image)?;

    let report = Report {
        config: equalizer.config(),
        width: size.width,
        height: size.height,
        channels: C,
        input_range: range(image.as_slice()),
        output_range: range(result.image.as_slice()),
        histogram: &result.histogram,
        cumulative: &result.cumulative,
        lut: &result.lut,
        timings: &result.timings,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("device: {}", equalizer.device());
    println!("image: {} x {} channel(s)", size, C);
    println!(
        "intensity range: {:?} -> {:?}",
        report.input_range, report.output_range
    );

    let occupied = result.histogram.iter().filter(|&&c| c > 0).count();
    println!("occupied bins: {} of {}", occupied, result.histogram.len());

    for timing in &result.timings {
        println!(
            "{:>18}: {:>3} launch(es) {:>10.3?}",
            timing.stage.to_string(),
            timing.launches,
            timing.duration
        );
    }
    println!("{:>18}: {:>10.3?}", "total", result.total_duration());

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = EqualizeConfig::default()
        .with_bins(args.bins)
        .with_histogram(args.histogram)
        .with_scan(args.scan)
        .with_remap(args.remap)
        .with_profile(log::log_enabled!(log::Level::Debug));
    config.work_group_size = args.group_size;
    if let Some(threads) = args.threads {
        config.execution = ExecutionStrategy::Fixed(threads);
    }

    log::info!("config: {}", serde_json::to_string(&config)?);

    if args.colour {
        run::<3>(&args, config)
    } else {
        run::<1>(&args, config)
    }
}
