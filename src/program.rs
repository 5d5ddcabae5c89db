//! Program tree: weeks -> days -> exercise entries -> blocks

use serde::{Deserialize, Serialize};

use crate::block::Block;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub week_number: u32,
    #[serde(default)]
    pub days: Vec<Day>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

/// An exercise slot within a day; several blocks are performed in sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    pub exercise: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Week {
    /// Empty week
    pub fn new(week_number: u32) -> Self {
        Self {
            week_number,
            days: Vec::new(),
        }
    }
}

impl Program {
    pub fn week(&self, week_number: u32) -> Option<&Week> {
        find_week(&self.weeks, week_number)
    }

    /// Block at a full coordinate, `None` if any level is missing
    pub fn block_at(
        &self,
        week_number: u32,
        day_index: usize,
        exercise_index: usize,
        block_index: usize,
    ) -> Option<&Block> {
        self.week(week_number)?
            .days
            .get(day_index)?
            .exercises
            .get(exercise_index)?
            .blocks
            .get(block_index)
    }

    /// Copy with every block's shape invariant restored
    pub fn normalized(&self) -> Program {
        let mut program = self.clone();
        for week in program.weeks.iter_mut() {
            for day in week.days.iter_mut() {
                for entry in day.exercises.iter_mut() {
                    entry.blocks = entry.blocks.iter().map(Block::normalized).collect();
                }
            }
        }
        program
    }

    /// Copy with the block at the coordinate replaced; unchanged if absent
    pub fn with_block(
        &self,
        week_number: u32,
        day_index: usize,
        exercise_index: usize,
        block_index: usize,
        block: Block,
    ) -> Program {
        let mut program = self.clone();
        let slot = program
            .weeks
            .iter_mut()
            .find(|w| w.week_number == week_number)
            .and_then(|w| w.days.get_mut(day_index))
            .and_then(|d| d.exercises.get_mut(exercise_index))
            .and_then(|e| e.blocks.get_mut(block_index));
        if let Some(slot) = slot {
            *slot = block;
        }
        program
    }
}

/// Week by its number (not its position)
pub fn find_week(weeks: &[Week], week_number: u32) -> Option<&Week> {
    weeks.iter().find(|w| w.week_number == week_number)
}
