//! Generating-screen readout derived from the session's progress value.

use serde::Serialize;

/// A stage shown while the story is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// Lowest progress at which this stage is current.
    pub threshold: u8,
    pub icon: &'static str,
    pub label: &'static str,
}

/// Ordered by ascending threshold; the first starts at zero.
pub static STAGES: [Stage; 6] = [
    Stage {
        threshold: 0,
        icon: "📸",
        label: "Learning your child's features…",
    },
    Stage {
        threshold: 15,
        icon: "✍️",
        label: "Writing the story…",
    },
    Stage {
        threshold: 30,
        icon: "🎨",
        label: "Painting the illustrations…",
    },
    Stage {
        threshold: 60,
        icon: "🖌️",
        label: "Adding finishing touches…",
    },
    Stage {
        threshold: 85,
        icon: "📖",
        label: "Binding the pages…",
    },
    Stage {
        threshold: 95,
        icon: "✨",
        label: "Almost ready!",
    },
];

/// The furthest stage reached at `progress`.
pub fn current_stage(progress: u8) -> &'static Stage {
    STAGES
        .iter()
        .rev()
        .find(|s| progress >= s.threshold)
        .unwrap_or(&STAGES[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub label: &'static str,
    pub icon: &'static str,
    /// Done once progress is strictly above this.
    pub after: u8,
}

pub static MILESTONES: [Milestone; 3] = [
    Milestone {
        label: "Photo AI",
        icon: "📸",
        after: 25,
    },
    Milestone {
        label: "Story",
        icon: "📝",
        after: 50,
    },
    Milestone {
        label: "Art",
        icon: "🎨",
        after: 90,
    },
];

impl Milestone {
    pub fn is_done(&self, progress: u8) -> bool {
        progress > self.after
    }
}

/// Minimum bar width so an empty bar is still visible.
pub const MIN_BAR_PERCENT: u8 = 5;

/// Everything the generating screen shows for one progress value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReadout {
    pub percent: u8,
    pub bar_percent: u8,
    pub stage: Stage,
    pub milestones: Vec<(Milestone, bool)>,
}

impl ProgressReadout {
    pub fn at(progress: u8) -> Self {
        let percent = progress.min(100);
        Self {
            percent,
            bar_percent: percent.max(MIN_BAR_PERCENT),
            stage: *current_stage(percent),
            milestones: MILESTONES
                .iter()
                .map(|m| (*m, m.is_done(percent)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_ascend_from_zero() {
        assert_eq!(STAGES[0].threshold, 0);
        assert!(STAGES.windows(2).all(|w| w[0].threshold < w[1].threshold));
    }

    #[test]
    fn stage_boundaries() {
        assert_eq!(current_stage(0).label, "Learning your child's features…");
        assert_eq!(current_stage(14).threshold, 0);
        assert_eq!(current_stage(15).threshold, 15);
        assert_eq!(current_stage(63).icon, "🖌️");
        assert_eq!(current_stage(100).label, "Almost ready!");
    }

    #[test]
    fn milestones_are_strict() {
        let readout = ProgressReadout::at(50);
        let done: Vec<bool> = readout.milestones.iter().map(|(_, d)| *d).collect();
        assert_eq!(done, vec![true, false, false]);
        assert!(MILESTONES[2].is_done(100));
    }

    #[test]
    fn bar_has_minimum_width() {
        assert_eq!(ProgressReadout::at(0).bar_percent, 5);
        assert_eq!(ProgressReadout::at(38).bar_percent, 38);
        assert_eq!(ProgressReadout::at(250).percent, 100);
    }
}
