use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::orchestrator::{CacheState, OfflineOrchestrator};
use crate::questions::{AnsweredQuestionEntry, Difficulty};

pub mod check;

pub use check::run_config_check;

pub async fn run_download(orchestrator: &Arc<OfflineOrchestrator>) -> Result<()> {
    info!("Downloading questions for offline play...");
    let count = orchestrator.download_for_offline().await?;
    println!("Downloaded {} questions for offline play", count);
    Ok(())
}

pub async fn run_status(orchestrator: &Arc<OfflineOrchestrator>, show_metrics: bool) -> Result<()> {
    let status = orchestrator.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if status.cache == CacheState::NotCached {
        info!("No offline questions cached, games will use the bundled set");
    }

    if show_metrics {
        println!("{}", orchestrator.context().metrics.encode_text());
    }
    Ok(())
}

pub async fn run_clear(orchestrator: &Arc<OfflineOrchestrator>) -> Result<()> {
    orchestrator.clear_offline_cache().await?;
    println!("Offline question cache cleared");
    Ok(())
}

pub async fn run_load(orchestrator: &Arc<OfflineOrchestrator>, show_questions: bool) -> Result<()> {
    let questions = orchestrator.load_offline_questions().await;
    let origin = if orchestrator.is_data_cached() {
        "offline cache"
    } else {
        "bundled set"
    };
    println!("{} questions available from the {}", questions.len(), origin);

    let mut by_difficulty: BTreeMap<&str, usize> = Difficulty::ALL
        .iter()
        .map(|difficulty| (difficulty.as_str(), 0))
        .collect();
    for question in &questions {
        *by_difficulty.entry(question.difficulty.as_str()).or_default() += 1;
    }
    for (difficulty, count) in by_difficulty {
        println!("  {:<8} {}", difficulty, count);
    }

    if show_questions {
        for question in &questions {
            println!(
                "[{}] ({}) {} -> {}",
                question.id,
                question.difficulty,
                question.question,
                question.correct_option().unwrap_or("?")
            );
        }
    }
    Ok(())
}

pub async fn run_answer(
    orchestrator: &Arc<OfflineOrchestrator>,
    question_id: String,
    correct: bool,
    time_taken: f64,
) -> Result<()> {
    let entry = AnsweredQuestionEntry::new(question_id, correct, time_taken);
    orchestrator.record_answer(&entry).await?;
    println!("Recorded answer for {}", entry.question_id);
    Ok(())
}

pub async fn run_history(orchestrator: &Arc<OfflineOrchestrator>, limit: Option<usize>) -> Result<()> {
    let history = orchestrator.answer_history().await;
    let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));

    if history.is_empty() {
        println!("No answers recorded");
        return Ok(());
    }

    let correct = history.iter().filter(|entry| entry.was_correct).count();
    println!(
        "{} answers recorded, {} correct ({:.0}%)",
        history.len(),
        correct,
        correct as f64 * 100.0 / history.len() as f64
    );
    for entry in history.iter().skip(skip) {
        println!(
            "{}  {:<12} {:<5} {:.1}s",
            entry.answered_at.format("%Y-%m-%d %H:%M:%S"),
            entry.question_id,
            if entry.was_correct { "ok" } else { "miss" },
            entry.time_taken
        );
    }
    Ok(())
}
