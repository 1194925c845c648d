//! Token sampling strategies

use anyhow::Result;
use candle_core::Tensor;

pub struct Sampler {
    /// `None` selects greedy decoding
    temperature: Option<f32>,
    top_p: f32,
    rng_state: u64,
}

impl Sampler {
    pub fn new(temperature: f32, top_p: f32, seed: u64) -> Self {
        Self {
            temperature: (temperature > 0.0).then_some(temperature),
            top_p,
            // xorshift never leaves zero
            rng_state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn sample(&mut self, logits: &Tensor) -> Result<u32> {
        let logits = logits.to_dtype(candle_core::DType::F32)?;
        let logits = logits.to_vec1::<f32>()?;
        self.sample_logits(&logits)
    }

    pub fn sample_logits(&mut self, logits: &[f32]) -> Result<u32> {
        if logits.is_empty() {
            anyhow::bail!("Cannot sample from empty logits");
        }

        let Some(temperature) = self.temperature else {
            return Ok(argmax(logits));
        };

        // Apply temperature
        let scaled: Vec<f32> = logits.iter().map(|&x| x / temperature).collect();

        // Softmax
        let max_logit = scaled.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = scaled.iter().map(|&x| (x - max_logit).exp()).collect();
        let sum: f32 = exp.iter().sum();
        let probs: Vec<f32> = exp.iter().map(|&x| x / sum).collect();

        // Top-p (nucleus) sampling
        let token = if self.top_p < 1.0 {
            self.sample_top_p(&probs)
        } else {
            self.sample_multinomial(&probs)
        };

        Ok(token)
    }

    fn sample_top_p(&mut self, probs: &[f32]) -> u32 {
        // Sort by probability descending
        let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        // Find cutoff for top-p
        let mut cumsum = 0.0;
        let mut cutoff_idx = indexed.len();
        for (i, (_, p)) in indexed.iter().enumerate() {
            cumsum += p;
            if cumsum >= self.top_p {
                cutoff_idx = i + 1;
                break;
            }
        }

        // Renormalize and sample
        let candidates = &indexed[..cutoff_idx];
        let sum: f32 = candidates.iter().map(|(_, p)| p).sum();

        let r = self.random_f32() * sum;
        let mut cumsum = 0.0;
        for (idx, p) in candidates {
            cumsum += p;
            if r < cumsum {
                return *idx as u32;
            }
        }

        candidates.last().map(|(idx, _)| *idx as u32).unwrap_or(0)
    }

    fn sample_multinomial(&mut self, probs: &[f32]) -> u32 {
        let r = self.random_f32();
        let mut cumsum = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumsum += p;
            if r < cumsum {
                return i as u32;
            }
        }
        (probs.len() - 1) as u32
    }

    fn random_f32(&mut self) -> f32 {
        // Simple xorshift64 PRNG
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 7;
        self.rng_state ^= self.rng_state << 17;

        // Convert to f32 in [0, 1)
        (self.rng_state as f64 / u64::MAX as f64) as f32
    }
}

/// Index of the largest logit; the first one wins on ties.
fn argmax(logits: &[f32]) -> u32 {
    let mut best = 0;
    for (i, &x) in logits.iter().enumerate() {
        if x > logits[best] {
            best = i;
        }
    }
    best as u32
}
