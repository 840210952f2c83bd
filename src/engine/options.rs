//! Recognized engine options and their value domains.

use crate::board::PextMode;
use crate::search::ParallelMode;

use super::{Engine, EngineError};

/// Engine-level options (search parameters live in `SearchParams`).
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Transposition table size in MiB (1..=32768).
    pub hash_mb: usize,
    /// Worker thread count (1..=512).
    pub threads: usize,
    /// Orchestration mode for threads > 1.
    pub parallel_mode: ParallelMode,
    /// Sliding-attack indexing selection.
    pub pext_mode: PextMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: 16,
            threads: 1,
            parallel_mode: ParallelMode::WorkStealing,
            pext_mode: PextMode::Disable,
        }
    }
}

fn invalid(name: &str, value: &str) -> EngineError {
    EngineError::InvalidOption {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_int<T: std::str::FromStr + PartialOrd>(
    name: &str,
    value: &str,
    min: T,
    max: T,
) -> Result<T, EngineError> {
    match value.trim().parse::<T>() {
        Ok(v) if v >= min && v <= max => Ok(v),
        _ => Err(invalid(name, value)),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, EngineError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

/// Apply one option to the engine. Every failure leaves the option
/// unchanged.
pub(super) fn apply(engine: &mut Engine, name: &str, value: &str) -> Result<(), EngineError> {
    match name {
        "Hash" => {
            let mb = parse_int(name, value, 1usize, 32768)?;
            engine.resize_hash(mb)
        }
        "Threads" => {
            engine.options_mut().threads = parse_int(name, value, 1usize, 512)?;
            Ok(())
        }
        "NullMove" => {
            engine.params_mut().null_move = parse_bool(name, value)?;
            Ok(())
        }
        "Futility" => {
            engine.params_mut().futility = parse_bool(name, value)?;
            Ok(())
        }
        "Razoring" => {
            engine.params_mut().razoring = parse_bool(name, value)?;
            Ok(())
        }
        "Aspiration" => {
            engine.params_mut().aspiration = parse_bool(name, value)?;
            Ok(())
        }
        "SingularExtension" => {
            engine.params_mut().singular_extension = parse_bool(name, value)?;
            Ok(())
        }
        "ProbCut" => {
            engine.params_mut().probcut = parse_bool(name, value)?;
            Ok(())
        }
        "CheckExtension" => {
            engine.params_mut().check_extension = parse_bool(name, value)?;
            Ok(())
        }
        "ParallelMode" => {
            let mode: ParallelMode = value.trim().parse().map_err(|()| invalid(name, value))?;
            engine.options_mut().parallel_mode = mode;
            Ok(())
        }
        "SplitMinDepth" => {
            engine.params_mut().split_min_depth = parse_int(name, value, 1i32, 32)?;
            Ok(())
        }
        "SplitMinMoves" => {
            engine.params_mut().split_min_moves = parse_int(name, value, 1usize, 64)?;
            Ok(())
        }
        "SmpAspirationDelta" => {
            engine.params_mut().smp_aspiration_delta = parse_int(name, value, 0i32, 400)?;
            Ok(())
        }
        "Pext" => {
            let mode: PextMode = value.trim().parse().map_err(|()| invalid(name, value))?;
            engine.set_pext_mode(mode);
            Ok(())
        }
        "TtAgingDepth" => {
            engine.params_mut().tt_aging_depth = parse_int(name, value, 1u8, 63)?;
            Ok(())
        }
        "HistoryPruningMinQuietIndex" => {
            engine.params_mut().history_prune_min_index = parse_int(name, value, 0usize, 64)?;
            Ok(())
        }
        "HistoryPruningThreshold" => {
            engine.params_mut().history_prune_threshold =
                parse_int(name, value, -100_000i32, 100_000)?;
            Ok(())
        }
        "HistoryPruningMaxDepth" => {
            engine.params_mut().history_prune_max_depth = parse_int(name, value, 0i32, 8)?;
            Ok(())
        }
        "SeeThreshold" => {
            engine.params_mut().see_good_capture_threshold =
                parse_int(name, value, -1000i32, 1000)?;
            Ok(())
        }
        _ => Err(invalid(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn test_option_ranges_enforced() {
        let mut engine = Engine::new(1);
        assert!(engine.set_option("Threads", "4").is_ok());
        assert_eq!(engine.options().threads, 4);

        assert!(engine.set_option("Threads", "0").is_err());
        assert!(engine.set_option("Threads", "513").is_err());
        assert_eq!(engine.options().threads, 4);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut engine = Engine::new(1);
        assert!(matches!(
            engine.set_option("Sparkle", "on"),
            Err(EngineError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_boolean_toggles() {
        let mut engine = Engine::new(1);
        engine.set_option("NullMove", "false").unwrap();
        assert!(!engine.params().null_move);
        engine.set_option("NullMove", "true").unwrap();
        assert!(engine.params().null_move);
        assert!(engine.set_option("NullMove", "maybe").is_err());
    }

    #[test]
    fn test_parallel_mode_option() {
        let mut engine = Engine::new(1);
        engine.set_option("ParallelMode", "LazySMP").unwrap();
        assert_eq!(engine.options().parallel_mode, ParallelMode::LazySmp);
        assert!(engine.set_option("ParallelMode", "clusters").is_err());
    }

    #[test]
    fn test_pext_mode_option() {
        let mut engine = Engine::new(1);
        engine.set_option("Pext", "Disable").unwrap();
        assert_eq!(engine.options().pext_mode, crate::board::PextMode::Disable);
        assert!(engine.set_option("Pext", "sometimes").is_err());
    }
}
