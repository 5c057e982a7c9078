use std::path::Path;

pub const SAMPLE_RATE: u32 = 44_100;

fn write_i16_wav(path: &Path, samples: impl Iterator<Item = f32>) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Exponentially decaying burst that reads as a drum one-shot.
pub fn write_hit(path: &Path, seconds: f64) {
    let total = (SAMPLE_RATE as f64 * seconds) as usize;
    write_i16_wav(
        path,
        (0..total).map(|idx| {
            let t = idx as f64 / SAMPLE_RATE as f64;
            let sign = if idx % 2 == 0 { 1.0 } else { -1.0 };
            (sign * 0.9 * (-t / 0.02).exp()) as f32
        }),
    );
}

/// Constant-level square wave that fails the decay check.
pub fn write_pad(path: &Path, seconds: f64) {
    let total = (SAMPLE_RATE as f64 * seconds) as usize;
    write_i16_wav(
        path,
        (0..total).map(|idx| if idx % 2 == 0 { 0.5 } else { -0.5 }),
    );
}
