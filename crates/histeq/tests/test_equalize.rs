use histeq::device::{Device, ExecutionStrategy};
use histeq::image::{Image, ImageSize};
use histeq::kernels::color::luma;
use histeq::{
    equalize_histogram, BinTable, EqualizeConfig, EqualizeError, HistogramEqualizer,
    HistogramStrategy, RemapSource, ScanStrategy,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn two_value_image() -> Result<Image<u8, 1>, Box<dyn std::error::Error>> {
    let mut data = vec![10u8; 32];
    data.extend(vec![200u8; 32]);
    Ok(Image::new(ImageSize { width: 8, height: 8 }, data)?)
}

fn random_image<const C: usize>(
    width: usize,
    height: usize,
    seed: u64,
) -> Result<Image<u8, C>, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    // low contrast, so equalization has something to stretch
    let data = (0..width * height * C)
        .map(|_| rng.random_range(90..140))
        .collect();
    Ok(Image::new(ImageSize { width, height }, data)?)
}

fn equalize<const C: usize>(
    image: &Image<u8, C>,
    config: EqualizeConfig,
) -> Result<histeq::Equalization<C>, EqualizeError> {
    HistogramEqualizer::new(Device::cpu(), config)?.equalize(image)
}

#[test]
fn test_two_value_image() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = two_value_image()?;
    let result = equalize(&image, EqualizeConfig::default())?;

    for (bin, &count) in result.histogram.iter().enumerate() {
        let expected = if bin == 10 || bin == 200 { 32 } else { 0 };
        assert_eq!(count, expected, "bin {bin}");
    }

    assert!(result.cumulative[..10].iter().all(|&c| c == 0));
    assert!(result.cumulative[10..200].iter().all(|&c| c == 32));
    assert!(result.cumulative[200..].iter().all(|&c| c == 64));

    assert_eq!(result.lut[10], 127);
    assert_eq!(result.lut[200], 255);

    for (src, dst) in image.as_slice().iter().zip(result.image.as_slice()) {
        let expected = if *src == 10 { 127 } else { 255 };
        assert_eq!(*dst, expected);
    }

    Ok(())
}

#[test]
fn test_uniform_image() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = Image::<u8, 1>::from_size_val(ImageSize { width: 13, height: 7 }, 128)?;

    for histogram in [HistogramStrategy::Naive, HistogramStrategy::Partitioned] {
        let config = EqualizeConfig::default().with_histogram(histogram);
        let result = equalize(&image, config)?;

        assert!(result.lut[..128].iter().all(|&v| v == 0));
        assert!(result.lut[128..].iter().all(|&v| v == 255));
        assert!(result.image.as_slice().iter().all(|&v| v == 255));
    }

    Ok(())
}

#[test]
fn test_histogram_strategies_agree() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    // odd size so the partitioned launch is padded
    let image = random_image::<1>(97, 61, 7)?;
    let naive = equalize(
        &image,
        EqualizeConfig::default().with_histogram(HistogramStrategy::Naive),
    )?;

    assert_eq!(naive.histogram.iter().sum::<u32>(), 97 * 61);

    for work_group_size in [None, Some(1), Some(64)] {
        let mut config = EqualizeConfig::default().with_histogram(HistogramStrategy::Partitioned);
        config.work_group_size = work_group_size;

        for _ in 0..5 {
            let partitioned = equalize(&image, config.clone())?;
            assert_eq!(partitioned.histogram, naive.histogram);
            assert_eq!(partitioned.image, naive.image);
        }
    }

    Ok(())
}

#[test]
fn test_scan_properties() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = random_image::<1>(64, 48, 11)?;
    let pixels = 64 * 48;

    let inclusive = equalize(&image, EqualizeConfig::default())?;
    let counts = &inclusive.histogram;
    assert_eq!(inclusive.cumulative[255], pixels);
    assert_eq!(inclusive.cumulative[0], counts[0]);
    for i in 1..256 {
        assert_eq!(inclusive.cumulative[i], inclusive.cumulative[i - 1] + counts[i]);
    }

    let exclusive = equalize(&image, EqualizeConfig::default().with_scan(ScanStrategy::Exclusive))?;
    assert_eq!(&exclusive.histogram, counts);
    assert_eq!(exclusive.cumulative[0], 0);
    for i in 1..256 {
        assert_eq!(exclusive.cumulative[i], exclusive.cumulative[i - 1] + counts[i - 1]);
    }

    for result in [&inclusive, &exclusive] {
        assert_eq!(result.lut.iter().max(), Some(&255));
        assert!(result.lut.windows(2).all(|w| w[0] <= w[1]));
    }

    Ok(())
}

#[test]
fn test_multi_launch_scans() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = random_image::<1>(40, 30, 3)?;

    for scan in [ScanStrategy::Inclusive, ScanStrategy::Exclusive] {
        let single = equalize(&image, EqualizeConfig::default().with_scan(scan))?;
        // 256 bins do not fit in a group of 16
        let config = EqualizeConfig::default()
            .with_scan(scan)
            .with_work_group_size(16);
        let rounds = equalize(&image, config)?;

        assert_eq!(single.timings[2].launches, if scan == ScanStrategy::Inclusive { 1 } else { 2 });
        assert!(rounds.timings[2].launches > 8);
        assert_eq!(rounds.cumulative, single.cumulative);
        assert_eq!(rounds.image, single.image);
    }

    Ok(())
}

#[test]
fn test_exclusive_divisor_excludes_top_bin() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let mut data = vec![0u8; 32];
    data.extend(vec![128u8; 16]);
    data.extend(vec![255u8; 16]);
    let image = Image::<u8, 1>::new(ImageSize { width: 8, height: 8 }, data)?;

    let inclusive = equalize(&image, EqualizeConfig::default())?;
    // 48 * 255 / 64
    assert_eq!(inclusive.lut[128], 191);
    assert_eq!(inclusive.lut[0], 127);

    let exclusive = equalize(&image, EqualizeConfig::default().with_scan(ScanStrategy::Exclusive))?;
    // the divisor is 64 - 16, the pixels below the top bin
    assert_eq!(exclusive.cumulative[255], 48);
    assert_eq!(exclusive.lut[128], 170);
    assert_eq!(exclusive.lut[0], 0);
    assert_eq!(exclusive.lut[255], 255);

    Ok(())
}

#[test]
fn test_exclusive_pads_bins() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let table = BinTable::from_boundaries(vec![0, 100, 200, 256])?;
    let image = Image::<u8, 1>::new(ImageSize { width: 4, height: 1 }, vec![50, 50, 150, 250])?;
    let config = EqualizeConfig::default().with_scan(ScanStrategy::Exclusive);

    let result = HistogramEqualizer::with_bin_table(Device::cpu(), config, table)?.equalize(&image)?;

    assert_eq!(result.histogram, vec![2, 1, 1]);
    assert_eq!(result.cumulative, vec![0, 2, 3]);
    assert_eq!(result.lut, vec![0, 170, 255]);
    assert_eq!(result.image.as_slice(), &[0, 0, 170, 255]);

    Ok(())
}

#[test]
fn test_remap_matches_lookup_table() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = random_image::<1>(33, 17, 5)?;

    for bins in [256, 64, 8] {
        let table = BinTable::uniform(bins)?;
        let result = equalize(&image, EqualizeConfig::default().with_bins(bins))?;

        for (src, dst) in image.as_slice().iter().zip(result.image.as_slice()) {
            let bin = table.bin_of(*src).ok_or("sample outside the bin table")?;
            assert_eq!(*dst as u32, result.lut[bin]);
        }
    }

    Ok(())
}

#[test]
fn test_colour_image() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let size = ImageSize { width: 2, height: 1 };
    let image = Image::<u8, 3>::new(size, vec![255, 0, 0, 0, 255, 0])?;

    // luma 54 and 182
    let result = equalize(&image, EqualizeConfig::default())?;
    assert_eq!(result.histogram.iter().sum::<u32>(), 2);
    assert_eq!((result.histogram[54], result.histogram[182]), (1, 1));
    assert_eq!((result.lut[54], result.lut[182]), (127, 255));
    // every channel goes through the table on its own
    assert_eq!(result.image.as_slice(), &[255, 0, 0, 0, 255, 0]);

    let result = equalize(&image, EqualizeConfig::default().with_remap(RemapSource::Luma))?;
    assert_eq!(result.image.as_slice(), &[127, 127, 127, 255, 255, 255]);

    Ok(())
}

#[test]
fn test_colour_strategies_agree() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let image = random_image::<3>(50, 21, 13)?;
    let reference = equalize(
        &image,
        EqualizeConfig::default().with_histogram(HistogramStrategy::Naive),
    )?;
    assert_eq!(reference.histogram.iter().sum::<u32>(), 50 * 21);

    for execution in [ExecutionStrategy::Serial, ExecutionStrategy::Fixed(3)] {
        let result = equalize(&image, EqualizeConfig::default().with_execution(execution))?;
        assert_eq!(result.histogram, reference.histogram);
        assert_eq!(result.image, reference.image);
    }

    // every sample of every channel goes through the table of its bin
    let bins = 32;
    let table = BinTable::uniform(bins)?;
    let mut expected = vec![0u32; bins];
    for px in image.as_slice().chunks_exact(3) {
        let bin = table.bin_of(luma(px[0], px[1], px[2])).ok_or("luma outside the bin table")?;
        expected[bin] += 1;
    }

    for scan in [ScanStrategy::Inclusive, ScanStrategy::Exclusive] {
        for histogram in [HistogramStrategy::Naive, HistogramStrategy::Partitioned] {
            for work_group_size in [None, Some(3), Some(16)] {
                let mut config = EqualizeConfig::default()
                    .with_bins(bins)
                    .with_scan(scan)
                    .with_histogram(histogram);
                config.work_group_size = work_group_size;
                let result = equalize(&image, config)?;

                assert_eq!(result.histogram, expected);
                for (src, dst) in image.as_slice().iter().zip(result.image.as_slice()) {
                    let bin = table.bin_of(*src).ok_or("sample outside the bin table")?;
                    assert_eq!(
                        *dst as u32, result.lut[bin],
                        "{scan:?} {histogram:?} {work_group_size:?}"
                    );
                }
            }
        }
    }

    Ok(())
}

#[test]
fn test_equalize_histogram_in_place() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let src = two_value_image()?;
    let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;

    equalize_histogram(&src, &mut dst, &EqualizeConfig::default())?;

    let mut values = dst.as_slice().to_vec();
    values.sort_unstable();
    values.dedup();
    assert_eq!(values, vec![127, 255]);

    Ok(())
}

#[test]
fn test_errors() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let empty = Image::<u8, 1>::new(ImageSize { width: 0, height: 4 }, vec![])?;
    assert_eq!(
        equalize(&empty, EqualizeConfig::default()).err(),
        Some(EqualizeError::EmptyImage)
    );

    let two_channels = Image::<u8, 2>::from_size_val(ImageSize { width: 2, height: 2 }, 1)?;
    assert_eq!(
        equalize(&two_channels, EqualizeConfig::default()).err(),
        Some(EqualizeError::UnsupportedChannels(2))
    );

    let white = Image::<u8, 1>::from_size_val(ImageSize { width: 4, height: 4 }, 255)?;
    assert_eq!(
        equalize(&white, EqualizeConfig::default().with_scan(ScanStrategy::Exclusive)).err(),
        Some(EqualizeError::ZeroCumulativeTotal)
    );
    // the inclusive scan still counts the top bin
    assert!(equalize(&white, EqualizeConfig::default()).is_ok());

    for bins in [0, 7, 512] {
        assert_eq!(
            HistogramEqualizer::new(Device::cpu(), EqualizeConfig::default().with_bins(bins)).err(),
            Some(EqualizeError::InvalidBinCount(bins))
        );
    }

    Ok(())
}
