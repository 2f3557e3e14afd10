//! Workout types and their burn rates.

use std::fmt;

/// Extra water per full 30 minutes of a workout.
pub const WATER_ML_PER_WORKOUT_BLOCK: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutKind {
    Running,
    Walking,
    Cycling,
    Swimming,
}

impl WorkoutKind {
    pub const ALL: [WorkoutKind; 4] = [
        Self::Running,
        Self::Walking,
        Self::Cycling,
        Self::Swimming,
    ];

    /// kcal burned per minute.
    pub fn kcal_per_minute(&self) -> u32 {
        match self {
            Self::Running => 10,
            Self::Walking => 5,
            Self::Cycling => 8,
            Self::Swimming => 12,
        }
    }

    /// Name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "бег",
            Self::Walking => "ходьба",
            Self::Cycling => "велосипед",
            Self::Swimming => "плавание",
        }
    }

    /// Case-insensitive lookup by Russian name or English alias.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "бег" | "running" => Some(Self::Running),
            "ходьба" | "walking" => Some(Self::Walking),
            "велосипед" | "cycling" => Some(Self::Cycling),
            "плавание" | "swimming" => Some(Self::Swimming),
            _ => None,
        }
    }

    /// Comma-separated list of every label.
    pub fn catalogue() -> String {
        Self::ALL
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Effect of one workout on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutEffect {
    pub burned_kcal: u32,
    pub extra_water_ml: u32,
}

impl WorkoutEffect {
    pub fn of(kind: WorkoutKind, minutes: u32) -> Self {
        Self {
            burned_kcal: kind.kcal_per_minute().saturating_mul(minutes),
            extra_water_ml: WATER_ML_PER_WORKOUT_BLOCK.saturating_mul(minutes / 30),
        }
    }
}
