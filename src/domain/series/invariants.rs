use super::entity::{Series, SeriesMembership};
use crate::domain::{DetectionMethod, DomainError, DomainResult};

/// Validates all Series invariants
pub fn validate_series(series: &Series) -> DomainResult<()> {
    if series.name.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Series name cannot be empty".to_string(),
        ));
    }

    if series.total_books == Some(0) {
        return Err(DomainError::InvariantViolation(
            "Series total_books must be positive when known".to_string(),
        ));
    }

    Ok(())
}

/// Validates all SeriesMembership invariants
pub fn validate_membership(membership: &SeriesMembership) -> DomainResult<()> {
    if membership.detection_method == DetectionMethod::None {
        return Err(DomainError::InvariantViolation(
            "A membership must record the method that detected it".to_string(),
        ));
    }

    if let Some(position) = membership.position_in_series {
        if !position.is_finite() || position < 0.0 {
            return Err(DomainError::InvariantViolation(format!(
                "Position {} is not a valid series position",
                position
            )));
        }
    }

    Ok(())
}

/// Invariants that must hold true for the Series domain:
///
/// 1. Names are unique up to normalization (case, surrounding and repeated whitespace)
/// 2. A series with members cannot be deleted
/// 3. At most one membership per (book, series)
/// 4. Positions, when known, are positive
/// 5. Book rows are never written by this domain
