use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const RATE: i64 = 16_000;
const TAKES: i64 = 2;

/// Two-tone burst standing in for a spoken digit: a fundamental plus a
/// "formant" whose frequency depends on the digit, under a Hann envelope.
fn digit_tone(pitch: f64, digit: usize, len: usize, noise: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let formant = 400.0 + 150.0 * digit as f64;
    let rate = RATE as f64;
    (0..len)
        .map(|n| {
            let t = n as f64 / rate;
            let env = 0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / len as f64).cos();
            let signal = 0.6 * (2.0 * std::f64::consts::PI * pitch * t).sin()
                + 0.3 * (2.0 * std::f64::consts::PI * formant * t).sin();
            env * signal + rng.gauss(0.0, noise)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Speaker {
    name: &'static str,
    sex: &'static str,
    age: i64,
    pitch: f64,
    channels: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let speakers = [
        Speaker { name: "alice", sex: "female", age: 37, pitch: 210.0, channels: 1 },
        Speaker { name: "bob", sex: "male", age: 48, pitch: 115.0, channels: 1 },
        Speaker { name: "carol", sex: "female", age: 29, pitch: 235.0, channels: 2 },
        Speaker { name: "dan", sex: "male", age: 61, pitch: 100.0, channels: 2 },
    ];
    let numbers = ["zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];

    let mut data_builder = ListBuilder::new(Float64Builder::new());
    let mut all_speaker: Vec<&str> = Vec::new();
    let mut all_sex: Vec<&str> = Vec::new();
    let mut all_age: Vec<i64> = Vec::new();
    let mut all_number: Vec<&str> = Vec::new();
    let mut all_take: Vec<i64> = Vec::new();
    let mut all_channels: Vec<i64> = Vec::new();

    for speaker in &speakers {
        for (digit, &number) in numbers.iter().enumerate() {
            for take in 0..TAKES {
                let len = 4000 + 400 * ((digit + take as usize) % 3);
                let mono = digit_tone(speaker.pitch, digit, len, 0.01, &mut rng);

                // Second channel is an attenuated copy with its own noise.
                let values = data_builder.values();
                for &v in &mono {
                    values.append_value(v);
                    if speaker.channels == 2 {
                        values.append_value(0.8 * v + rng.gauss(0.0, 0.005));
                    }
                }
                data_builder.append(true);

                all_speaker.push(speaker.name);
                all_sex.push(speaker.sex);
                all_age.push(speaker.age);
                all_number.push(number);
                all_take.push(take);
                all_channels.push(speaker.channels as i64);
            }
        }
    }

    let n_rows = all_take.len();
    let schema = Arc::new(Schema::new(vec![
        Field::new("data", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("fs", DataType::Int64, false),
        Field::new("channels", DataType::Int64, false),
        Field::new("speaker", DataType::Utf8, false),
        Field::new("sex", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("number", DataType::Utf8, false),
        Field::new("take", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(data_builder.finish()),
            Arc::new(Int64Array::from(vec![RATE; n_rows])),
            Arc::new(Int64Array::from(all_channels)),
            Arc::new(StringArray::from(all_speaker)),
            Arc::new(StringArray::from(all_sex)),
            Arc::new(Int64Array::from(all_age)),
            Arc::new(StringArray::from(all_number)),
            Arc::new(Int64Array::from(all_take)),
        ],
    )
    .context("building record batch")?;

    let output_path = "sample_corpus.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!("Wrote {n_rows} samples ({} speakers) to {output_path}", speakers.len());
    Ok(())
}
