use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Writes a sales-like CSV (`date,amount,country,units`) covering one quarter.
/// A few cells are left blank or garbled so missing-value handling shows up.
fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_sales.csv".to_string());
    let mut rng = SimpleRng::new(42);

    let countries = ["CO", "PE", "AR", "MX", "CL"];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record(["date", "amount", "country", "units"])?;

    let mut rows = 0usize;
    for day in 0..91u64 {
        let date = start
            .checked_add_days(Days::new(day))
            .context("date out of range")?;
        let per_day = 1 + rng.next_u64() % 4;
        for _ in 0..per_day {
            let units = 1 + rng.next_u64() % 20;
            let price = 5.0 + rng.next_f64() * 45.0;
            let amount = match rng.next_u64() % 50 {
                0 => String::new(),
                1 => "n/a".to_string(),
                _ => format!("{:.2}", units as f64 * price),
            };
            let date_text = if rng.next_u64() % 100 == 0 {
                "unknown".to_string()
            } else {
                date.format("%Y-%m-%d").to_string()
            };
            writer.write_record([
                date_text,
                amount,
                rng.pick(&countries).to_string(),
                units.to_string(),
            ])?;
            rows += 1;
        }
    }
    writer.flush().context("flushing output")?;

    println!("Wrote {rows} rows to {output_path}");
    Ok(())
}
