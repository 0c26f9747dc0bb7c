//! Read-side projections over the catalogue and learner progress.
//!
//! Nothing here feeds back into scheduling.

use chrono::{DateTime, Utc};

use revise_core::model::{MasteryBox, ProgressMap, Question, Topic, TopicId};
use revise_core::scheduler::is_question_due;

/// Coarse label for a mastery percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasteryBand {
    Weak,
    Building,
    Strong,
}

impl MasteryBand {
    #[must_use]
    pub fn from_percent(percent: u32) -> Self {
        if percent > 70 {
            MasteryBand::Strong
        } else if percent > 30 {
            MasteryBand::Building
        } else {
            MasteryBand::Weak
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MasteryBand::Weak => "weak",
            MasteryBand::Building => "building",
            MasteryBand::Strong => "strong",
        }
    }
}

/// Average box of a topic's questions against the top box, as a rounded percentage.
///
/// Questions without progress count as box 0. A topic with no questions is 0%.
#[must_use]
pub fn topic_mastery(pool: &[Question], progress: &ProgressMap, topic_id: &TopicId) -> u32 {
    let boxes: Vec<u64> = pool
        .iter()
        .filter(|q| &q.topic_id == topic_id)
        .map(|q| {
            progress
                .get(&q.id)
                .map_or(0, |item| u64::from(item.box_level().level()))
        })
        .collect();

    if boxes.is_empty() {
        return 0;
    }

    let max = boxes.len() as u64 * u64::from(MasteryBox::MAX.level());
    let sum: u64 = boxes.iter().sum();
    rounded_percent(sum, max)
}

/// Number of pool questions due at `now`, unseen questions included.
#[must_use]
pub fn due_count(pool: &[Question], progress: &ProgressMap, now: DateTime<Utc>) -> usize {
    pool.iter()
        .filter(|q| is_question_due(progress, &q.id, now))
        .count()
}

/// Share of pool questions that have been graded at least once.
#[must_use]
pub fn practiced_percent(pool: &[Question], progress: &ProgressMap) -> u32 {
    if pool.is_empty() {
        return 0;
    }
    let practiced = pool.iter().filter(|q| progress.contains_key(&q.id)).count();
    rounded_percent(practiced as u64, pool.len() as u64)
}

/// Per-topic row for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicReport {
    pub topic_id: TopicId,
    pub title: String,
    pub question_count: usize,
    pub due: usize,
    pub mastery: u32,
    pub band: MasteryBand,
}

#[must_use]
pub fn topic_reports(
    topics: &[Topic],
    pool: &[Question],
    progress: &ProgressMap,
    now: DateTime<Utc>,
) -> Vec<TopicReport> {
    topics
        .iter()
        .map(|topic| {
            let questions: Vec<Question> = pool
                .iter()
                .filter(|q| q.topic_id == topic.id)
                .cloned()
                .collect();
            let mastery = topic_mastery(&questions, progress, &topic.id);
            TopicReport {
                topic_id: topic.id.clone(),
                title: topic.title.clone(),
                question_count: questions.len(),
                due: due_count(&questions, progress, now),
                mastery,
                band: MasteryBand::from_percent(mastery),
            }
        })
        .collect()
}

fn rounded_percent(part: u64, whole: u64) -> u32 {
    // Half rounds up, matching `Math.round` on non-negative values.
    let pct = (part * 200 + whole) / (whole * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}
