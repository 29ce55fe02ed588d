//! Boundary invariant enforcement (spec §3, §4.D Stage 1/2, component G).
//!
//! The source repo carried two overlapping validators with slightly
//! different rules; per spec §9 this module fixes the rule set to §3 and
//! treats anything else as accidental.

use crate::error::{Result, RuntimeError};
use crate::types::{ObjectType, RoomRequest, Scenario};

/// Validates an inbound [`RoomRequest`] before admission.
pub struct RequestValidator;

impl RequestValidator {
    pub fn validate(request: &RoomRequest) -> Result<()> {
        if request.theme.trim().is_empty() {
            return Err(RuntimeError::validation("theme must not be empty"));
        }
        if request.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(RuntimeError::validation(
                "at least one non-empty keyword is required",
            ));
        }
        let has_exit_door = request
            .existing_objects
            .iter()
            .any(|o| o.name.eq_ignore_ascii_case("ExitDoor"));
        if !has_exit_door {
            return Err(RuntimeError::validation(
                "existingObjects must contain an entry named ExitDoor",
            ));
        }
        Ok(())
    }
}

/// Validates the shape of an LLM-produced [`Scenario`] before it is used to
/// drive generation.
pub struct ScenarioValidator;

impl ScenarioValidator {
    pub fn validate(scenario: &Scenario) -> Result<()> {
        let Some(first) = scenario.object_instructions.first() else {
            return Err(RuntimeError::validation(
                "object_instructions must contain at least one entry",
            ));
        };
        if first.kind != ObjectType::GameManager || first.name != "GameManager" {
            return Err(RuntimeError::validation(
                "first object_instruction must be {type: game_manager, name: GameManager}",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, ExistingObject};

    fn base_request() -> RoomRequest {
        RoomRequest {
            uuid: None,
            user_id: "u1".into(),
            theme: "haunted lab".into(),
            keywords: vec!["lantern".into()],
            difficulty: Difficulty::Normal,
            existing_objects: vec![ExistingObject {
                name: "ExitDoor".into(),
                id: "e1".into(),
            }],
            is_free_modeling: false,
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(RequestValidator::validate(&base_request()).is_ok());
    }

    #[test]
    fn rejects_empty_theme() {
        let mut r = base_request();
        r.theme = "  ".into();
        assert!(RequestValidator::validate(&r).is_err());
    }

    #[test]
    fn rejects_missing_exit_door() {
        let mut r = base_request();
        r.existing_objects.clear();
        assert!(RequestValidator::validate(&r).is_err());
    }

    #[test]
    fn accepts_exit_door_case_insensitive() {
        let mut r = base_request();
        r.existing_objects = vec![ExistingObject {
            name: "exitdoor".into(),
            id: "e2".into(),
        }];
        assert!(RequestValidator::validate(&r).is_ok());
    }
}
