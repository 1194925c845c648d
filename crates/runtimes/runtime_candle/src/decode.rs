//! The prompt-then-generate token loop, independent of the model type

use aiterm_runtime_api::GenerationFailure;
use std::collections::HashSet;

/// Limits applied to one generation call
pub struct DecodeLimits<'a> {
    pub max_tokens: usize,
    pub context_size: usize,
    pub stop_tokens: &'a HashSet<u32>,
}

/// Feed `prompt` and keep sampling until a stop token, the token budget or
/// the end of the context window.
///
/// `step(tokens, index_pos)` runs the model over `tokens` starting at
/// position `index_pos` and returns the next sampled token. A failure on the
/// prompt aborts the call; a failure while feeding back a generated token
/// ends generation with what was produced so far.
pub fn decode_loop<F>(
    prompt: &[u32],
    limits: &DecodeLimits<'_>,
    mut step: F,
) -> Result<Vec<u32>, GenerationFailure>
where
    F: FnMut(&[u32], usize) -> anyhow::Result<u32>,
{
    if prompt.is_empty() {
        return Err(GenerationFailure::Tokenization("prompt produced no tokens".to_string()));
    }
    if prompt.len() >= limits.context_size {
        return Err(GenerationFailure::Tokenization(format!(
            "prompt is {} tokens, context window is {}",
            prompt.len(),
            limits.context_size
        )));
    }

    let mut generated = Vec::with_capacity(limits.max_tokens);
    if limits.max_tokens == 0 {
        return Ok(generated);
    }

    let mut next = step(prompt, 0).map_err(|e| GenerationFailure::PromptDecoding(e.to_string()))?;
    let mut pos = prompt.len();

    loop {
        if limits.stop_tokens.contains(&next) {
            tracing::debug!("Stop token {} after {} tokens", next, generated.len());
            break;
        }
        generated.push(next);

        if generated.len() >= limits.max_tokens {
            break;
        }
        if pos + 1 >= limits.context_size {
            tracing::debug!("Context window full at {} tokens", pos + 1);
            break;
        }

        match step(&[next], pos) {
            Ok(token) => {
                next = token;
                pos += 1;
            }
            Err(e) => {
                tracing::warn!("Decoding generated token failed, stopping early: {}", e);
                break;
            }
        }
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limits(max_tokens: usize, context_size: usize, stop: &HashSet<u32>) -> DecodeLimits<'_> {
        DecodeLimits { max_tokens, context_size, stop_tokens: stop }
    }

    /// Emits 100, 101, 102, ... and records every call.
    fn counting_model(calls: &mut Vec<(Vec<u32>, usize)>) -> impl FnMut(&[u32], usize) -> anyhow::Result<u32> + '_ {
        let mut next = 100;
        move |tokens: &[u32], pos: usize| {
            calls.push((tokens.to_vec(), pos));
            next += 1;
            Ok(next - 1)
        }
    }

    #[test]
    fn stops_at_token_budget() {
        let stop = HashSet::new();
        let mut calls = Vec::new();
        let out = decode_loop(&[1, 2, 3], &limits(4, 2048, &stop), counting_model(&mut calls)).unwrap();

        assert_eq!(out, vec![100, 101, 102, 103]);
        assert_eq!(calls[0], (vec![1, 2, 3], 0));
        assert_eq!(calls[1], (vec![100], 3));
        assert_eq!(calls.len(), 4);
    }

    #[test]
    fn stop_token_is_not_emitted() {
        let stop: HashSet<u32> = [102].into_iter().collect();
        let mut calls = Vec::new();
        let out = decode_loop(&[1], &limits(50, 2048, &stop), counting_model(&mut calls)).unwrap();
        assert_eq!(out, vec![100, 101]);
    }

    #[test]
    fn stops_when_context_is_full() {
        let stop = HashSet::new();
        let mut calls = Vec::new();
        let out = decode_loop(&[1, 2, 3], &limits(50, 6, &stop), counting_model(&mut calls)).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn oversized_prompt_fails_tokenization() {
        let stop = HashSet::new();
        let mut calls = Vec::new();
        let err = decode_loop(&[1, 2, 3, 4], &limits(8, 4, &stop), counting_model(&mut calls)).unwrap_err();
        assert!(matches!(err, GenerationFailure::Tokenization(_)));
        assert!(calls.is_empty());
    }

    #[test]
    fn prompt_failure_is_reported() {
        let stop = HashSet::new();
        let err = decode_loop(&[1], &limits(8, 64, &stop), |_, _| anyhow::bail!("out of memory"))
            .unwrap_err();
        assert_eq!(err, GenerationFailure::PromptDecoding("out of memory".to_string()));
    }

    #[test]
    fn failure_mid_generation_keeps_partial_output() {
        let stop = HashSet::new();
        let out = decode_loop(&[1], &limits(8, 64, &stop), |_, pos| {
            if pos < 3 {
                Ok(10 + pos as u32)
            } else {
                anyhow::bail!("decode failed")
            }
        })
        .unwrap();
        assert_eq!(out, vec![10, 11, 12]);
    }

    #[test]
    fn zero_budget_generates_nothing() {
        let stop = HashSet::new();
        let mut calls = Vec::new();
        let out = decode_loop(&[1], &limits(0, 64, &stop), counting_model(&mut calls)).unwrap();
        assert!(out.is_empty());
        assert!(calls.is_empty());
    }
}
