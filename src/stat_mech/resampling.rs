/*
Resampling engine

Every estimator gets its bootstrap and block errors the same way: the point
estimate is re-applied to each resample (or block) of the work values and the
error is the spread of those replicas. The estimators hand a closure to this
module instead of carrying their own loops.

Random numbers come from per-replica sub-streams, derived from
(seed, stream, replica index). Replica i therefore always sees the same draws,
whether the loop runs sequentially or on the rayon pool, and whichever other
estimators ran before it.
*/

use crate::error::{EstimatorError, Result};
use crate::stat_mech::descriptive::stdev_sample;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Independent random streams, one per consumer of randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RngStream {
    CgiParametric,
    CgiBootstrap,
    BarBootstrap,
    JarzynskiBootstrap,
    Selection,
}

impl RngStream {
    fn tag(self) -> u64 {
        match self {
            RngStream::CgiParametric => 0x43_47_49_50,
            RngStream::CgiBootstrap => 0x43_47_49_42,
            RngStream::BarBootstrap => 0x42_41_52_42,
            RngStream::JarzynskiBootstrap => 0x4a_41_52_42,
            RngStream::Selection => 0x53_45_4c_45,
        }
    }
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic generator for replica `index` of `stream`.
pub fn substream(seed: u64, stream: RngStream, index: usize) -> StdRng {
    let stream_seed = splitmix64(seed ^ splitmix64(stream.tag()));
    StdRng::seed_from_u64(splitmix64(stream_seed ^ splitmix64(index as u64)))
}

pub fn resample_with_replacement<R: Rng + ?Sized>(distribution: &[f64], rng: &mut R) -> Vec<f64> {
    let n = distribution.len();
    (0..n).map(|_| distribution[rng.random_range(0..n)]).collect()
}

/// `count` resamples of `distribution`, each of the same size, drawn with
/// replacement from a single sequentially advanced generator.
pub fn bootstrap_resample<R: Rng + ?Sized>(
    distribution: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    (0..count)
        .map(|_| resample_with_replacement(distribution, rng))
        .collect()
}

/// Split into `nblocks` contiguous runs, keeping the collection order.
///
/// When the length is not a multiple of `nblocks`, the first `len % nblocks`
/// blocks carry one extra value each.
pub fn block_partition(distribution: &[f64], nblocks: usize) -> Result<Vec<&[f64]>> {
    if nblocks == 0 {
        return Err(EstimatorError::InvalidConfig(
            "nblocks must be at least 1".to_string(),
        ));
    }
    let len = distribution.len();
    if nblocks > len {
        return Err(EstimatorError::insufficient("block partition", nblocks, len));
    }

    let base = len / nblocks;
    let extra = len % nblocks;
    let mut blocks = Vec::with_capacity(nblocks);
    let mut start = 0;
    for block in 0..nblocks {
        let size = base + usize::from(block < extra);
        blocks.push(&distribution[start..start + size]);
        start += size;
    }
    Ok(blocks)
}

/// Sample standard deviation of the replicas; `None` below two replicas, so
/// the error kind is left out rather than reported as zero.
pub fn spread<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().collect();
    stdev_sample(&values)
}

fn keep_successes<T>(label: &str, outcomes: Vec<Result<T>>) -> Vec<T> {
    let total = outcomes.len();
    let mut kept = Vec::with_capacity(total);
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => kept.push(value),
            Err(err) => log::warn!("{label} replica {index} dropped: {err}"),
        }
    }
    if kept.len() < total {
        log::warn!("{label}: {} of {total} replicas usable", kept.len());
    }
    kept
}

#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    seed: u64,
    stream: RngStream,
}

impl Resampler {
    pub fn new(seed: u64, stream: RngStream) -> Self {
        Self { seed, stream }
    }

    /// Runs `draw` once per replica with that replica's own generator.
    /// Failed replicas are logged and dropped.
    pub fn replicate<T, F>(&self, label: &str, count: usize, draw: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut StdRng) -> Result<T> + Sync,
    {
        let run = |index: usize| {
            let mut rng = substream(self.seed, self.stream, index);
            draw(&mut rng)
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<T>> = (0..count).map(run).collect();

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<T>> = (0..count).into_par_iter().map(run).collect();

        keep_successes(label, outcomes)
    }

    /// Nonparametric bootstrap over a forward/reverse pair: both directions
    /// are resampled independently and handed to `estimate`.
    pub fn bootstrap<T, F>(&self, forward: &[f64], reverse: &[f64], nboots: usize, estimate: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&[f64], &[f64]) -> Result<T> + Sync,
    {
        self.replicate("bootstrap", nboots, |rng| {
            let f = resample_with_replacement(forward, rng);
            let r = resample_with_replacement(reverse, rng);
            estimate(&f, &r)
        })
    }
}

/// Re-applies `estimate` to matching blocks of the two directions (block i of
/// the forward work with block i of the reverse work).
pub fn block_estimates<T, F>(forward: &[f64], reverse: &[f64], nblocks: usize, estimate: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&[f64], &[f64]) -> Result<T> + Sync,
{
    let forward_blocks = block_partition(forward, nblocks)?;
    let reverse_blocks = block_partition(reverse, nblocks)?;
    let pairs: Vec<(&[f64], &[f64])> = forward_blocks.into_iter().zip(reverse_blocks).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Result<T>> = pairs.iter().map(|(f, r)| estimate(f, r)).collect();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Result<T>> = pairs.par_iter().map(|(f, r)| estimate(f, r)).collect();

    Ok(keep_successes("block", outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat_mech::descriptive::mean;

    #[test]
    fn bootstrap_draws_come_from_the_input() {
        let w = [1.0, 2.0, 3.0, 4.0];
        let mut rng = StdRng::seed_from_u64(7);
        let boots = bootstrap_resample(&w, 25, &mut rng);
        assert_eq!(boots.len(), 25);
        for sample in &boots {
            assert_eq!(sample.len(), w.len());
            assert!(sample.iter().all(|x| w.contains(x)));
        }
    }

    #[test]
    fn same_seed_same_resamples() {
        let w = [0.5, 1.5, 2.5, 3.5, 4.5];
        let a = bootstrap_resample(&w, 10, &mut StdRng::seed_from_u64(11));
        let b = bootstrap_resample(&w, 10, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn partition_keeps_order_and_front_loads_remainder() {
        let w: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let blocks = block_partition(&w, 3).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(blocks[1], &[4.0, 5.0, 6.0]);
        assert_eq!(blocks[2], &[7.0, 8.0, 9.0]);

        let single = block_partition(&w, 1).unwrap();
        assert_eq!(single, vec![w.as_slice()]);
    }

    #[test]
    fn partition_rejects_more_blocks_than_values() {
        let err = block_partition(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::InsufficientData {
                required: 3,
                available: 2,
                ..
            }
        ));
        assert!(matches!(
            block_partition(&[1.0], 0),
            Err(EstimatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn replicas_are_reproducible_and_distinct_per_stream() {
        let w = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let run = |stream| {
            Resampler::new(42, stream).bootstrap(&w, &w, 50, |f, r| Ok(mean(f) - mean(r)))
        };
        let first = run(RngStream::BarBootstrap);
        let second = run(RngStream::BarBootstrap);
        assert_eq!(first, second);

        let other = run(RngStream::JarzynskiBootstrap);
        assert_ne!(first, other);
    }

    #[test]
    fn failing_replicas_are_dropped_not_fatal() {
        let kept = Resampler::new(0, RngStream::CgiBootstrap).replicate("test", 10, |rng| {
            let x: f64 = rng.random();
            Ok(x)
        });
        assert_eq!(kept.len(), 10);
        assert!(kept.iter().all(|x| (0.0..1.0).contains(x)));

        let w = [1.0, 2.0, 3.0, 4.0];
        let blocks = block_estimates(&w, &w, 2, |f, _| {
            if f[0] > 2.0 {
                Err(EstimatorError::DegenerateVariance {
                    what: "test".to_string(),
                })
            } else {
                Ok(f[0])
            }
        })
        .unwrap();
        assert_eq!(blocks, vec![1.0]);
    }

    #[test]
    fn spread_needs_two_replicas() {
        assert!(spread([1.0]).is_none());
        let s = spread([1.0, 3.0]).unwrap();
        assert!((s - 2.0_f64.sqrt()).abs() < 1e-12);
    }
}
