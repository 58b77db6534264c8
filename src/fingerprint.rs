//! Outbound identity rotation.
//!
//! Public Piped and Cobalt instances throttle obvious bot traffic. Each
//! provider attempt presents a User-Agent drawn from a fixed set of real
//! browser strings. The choice is stateless: the random source is passed
//! in, so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;

/// Browser User-Agent strings, desktop and mobile.
pub const IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 11) AppleWebKit/537.36 Chrome/120 Mobile",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
];

/// Pick one identity from [`IDENTITIES`].
pub fn choose_identity<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    IDENTITIES.choose(rng).copied().unwrap_or(IDENTITIES[0])
}

/// [`choose_identity`] over the thread-local generator.
pub fn random_identity() -> &'static str {
    choose_identity(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn identity_comes_from_fixed_set() {
        for _ in 0..50 {
            assert!(IDENTITIES.contains(&random_identity()));
        }
    }

    #[test]
    fn same_seed_same_identity() {
        let a = choose_identity(&mut StdRng::seed_from_u64(7));
        let b = choose_identity(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn identities_look_like_browsers() {
        for identity in IDENTITIES {
            assert!(identity.starts_with("Mozilla/5.0"));
        }
    }
}
