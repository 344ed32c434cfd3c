use ocr_prep::config::Config;
use ocr_prep::pixel::packed::{pack_all, unpack_into};
use ocr_prep::preprocessing::kernel::{kernel_radius, BlurKernel};
use ocr_prep::preprocessing::steps::{blur, threshold};
use ocr_prep::preprocessing::KernelCache;
use ocr_prep::{OcrError, Pipeline, PixelBuffer, Preset, Stage};
use std::process::Command;

fn noisy(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::filled(width, height, [0, 0, 0, 255]);
    let mut seed = 0x2545_f491u32;
    for y in 0..height {
        for x in 0..width {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let [r, g, b, a] = seed.to_le_bytes();
            buf.set_pixel(x, y, [r, g, b, a]);
        }
    }
    buf
}

#[test]
fn white_image_survives_threshold() {
    let mut buf = PixelBuffer::filled(2, 2, [255, 255, 255, 255]);
    Pipeline::new(vec![Stage::Threshold { level: 0.5 }])
        .process(&mut buf)
        .unwrap();
    assert_eq!(buf.as_bytes(), &[255u8; 16]);
}

#[test]
fn grey_image_survives_blur() {
    let mut buf = PixelBuffer::filled(4, 4, [128, 128, 128, 255]);
    Pipeline::new(vec![Stage::Blur { radius: 2.0 }])
        .process(&mut buf)
        .unwrap();
    assert_eq!(buf, PixelBuffer::filled(4, 4, [128, 128, 128, 255]));
}

#[test]
fn threshold_output_is_binary_and_idempotent() {
    let original = noisy(17, 9);
    let mut once = original.clone();
    threshold::apply(&mut once, 0.5).unwrap();

    for (out, src) in once
        .as_bytes()
        .chunks_exact(4)
        .zip(original.as_bytes().chunks_exact(4))
    {
        assert!(out[..3].iter().all(|&v| v == 0 || v == 255));
        assert_eq!(out[3], src[3]);
    }

    let mut twice = once.clone();
    threshold::apply(&mut twice, 0.5).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn codec_round_trip_on_noise() {
    let buf = noisy(11, 7);
    let mut restored = vec![0u8; buf.as_bytes().len()];
    unpack_into(&pack_all(buf.as_bytes()), &mut restored);
    assert_eq!(restored, buf.as_bytes());
}

#[test]
fn kernel_radius_bounds() {
    for requested in [0.0f32, 0.1, 71.0, 1000.0] {
        let r = kernel_radius(requested);
        assert!((1..=248).contains(&r));
        let scaled = (requested * 3.5).floor();
        if (1.0..=248.0).contains(&scaled) {
            assert_eq!(r, scaled as usize);
        }
    }
}

#[test]
fn kernel_weights_are_symmetric() {
    let kernel = BlurKernel::build(4.2);
    let r = kernel.radius();
    for i in 0..=r {
        assert_eq!(kernel.weights()[i], kernel.weights()[2 * r - i]);
    }
}

#[test]
fn blur_keeps_length_and_range() {
    let cache = KernelCache::new();
    for (w, h) in [(1, 1), (3, 20), (31, 2), (16, 16)] {
        let mut buf = noisy(w, h);
        blur::apply(&mut buf, 1.7, &cache).unwrap();
        assert_eq!(buf.as_bytes().len(), (w * h * 4) as usize);
    }
}

#[test]
fn blur_uniform_colour_is_fixed_point_for_any_radius() {
    let cache = KernelCache::new();
    for radius in [0.0, 0.5, 1.0, 3.3, 71.0] {
        let mut buf = PixelBuffer::filled(12, 7, [200, 100, 50, 255]);
        blur::apply(&mut buf, radius, &cache).unwrap();
        assert_eq!(buf, PixelBuffer::filled(12, 7, [200, 100, 50, 255]));
    }
}

#[test]
fn blur_stays_within_input_range() {
    let mut buf = PixelBuffer::filled(10, 10, [60, 60, 60, 255]);
    buf.set_pixel(9, 9, [90, 90, 90, 255]);
    blur::apply(&mut buf, 1.0, &KernelCache::new()).unwrap();
    for px in buf.as_bytes().chunks_exact(4) {
        assert!((60..=90).contains(&px[0]));
        assert_eq!(px[3], 255);
    }
}

#[test]
fn blur_rejects_wrong_dimensions_without_mutation() {
    let mut pixels = vec![9u8; 24];
    let err = blur::blur(&mut pixels, 4, 4, &BlurKernel::build(1.0)).unwrap_err();
    assert!(matches!(err, OcrError::InvalidInput(_)));
    assert_eq!(pixels, vec![9u8; 24]);
}

#[test]
fn shared_pipeline_across_threads() {
    let pipeline = std::sync::Arc::new(Pipeline::from_preset(Preset::Smooth));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = std::sync::Arc::clone(&pipeline);
            std::thread::spawn(move || {
                let mut buf = PixelBuffer::filled(8, 8, [250, 250, 250, 255]);
                pipeline.process(&mut buf).unwrap();
                buf
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            PixelBuffer::filled(8, 8, [255, 255, 255, 255])
        );
    }
}

#[test]
fn config_defaults_to_threshold_pipeline() {
    let pipeline = Config::default().pipeline();
    assert_eq!(pipeline.label(), "default");
    assert_eq!(pipeline.stages(), &[Stage::Threshold { level: 0.5 }]);
}

#[test]
fn cli_process_writes_filtered_image() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");

    let mut source = PixelBuffer::filled(5, 5, [20, 20, 20, 255]);
    source.set_pixel(2, 2, [240, 240, 240, 255]);
    std::fs::write(&input, source.encode_png().unwrap()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_ocr-prep"))
        .arg("process")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--no-recognize", "--stages", "threshold:0.5"])
        .status()
        .expect("Failed to run ocr-prep");
    assert!(status.success());

    let result = PixelBuffer::decode(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(result.pixel(2, 2), Some([255, 255, 255, 255]));
    assert_eq!(result.pixel(0, 0), Some([0, 0, 0, 255]));
}

#[test]
fn cli_process_fails_on_undecodable_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");
    std::fs::write(&input, b"not a png").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_ocr-prep"))
        .arg("process")
        .arg(&input)
        .args(["-o"])
        .arg(&output)
        .arg("--no-recognize")
        .status()
        .expect("Failed to run ocr-prep");
    assert!(!status.success());
    assert!(!output.exists());
}
