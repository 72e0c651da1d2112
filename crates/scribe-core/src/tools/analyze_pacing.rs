use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Tool;
use crate::db::scripts::Scene;
use crate::Db;

pub struct AnalyzePacingTool<'a> {
    pub script_id: Uuid,
    pub db: &'a Db,
}

/// A line is read as a character cue (start of a dialogue block) when it's
/// short, all-uppercase, and not punctuated like a sentence -- the same
/// convention screenplay formatting itself relies on.
fn is_character_cue(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.len() <= 30
        && trimmed == trimmed.to_uppercase()
        && !trimmed.ends_with('.')
}

fn dialogue_char_count(content: &str) -> usize {
    let mut in_dialogue = false;
    let mut dialogue_chars = 0usize;
    for line in content.lines() {
        if line.trim().is_empty() {
            in_dialogue = false;
            continue;
        }
        if is_character_cue(line) {
            in_dialogue = true;
            continue;
        }
        if in_dialogue {
            dialogue_chars += line.len();
        }
    }
    dialogue_chars
}

/// Terciles: act 1 = first quarter, act 2 = middle half, act 3 = last
/// quarter of the script's scene count -- a standard three-act proportion
/// used only for this no-LLM aggregate, not persisted anywhere.
fn act_for_position(position: i32, total_scenes: usize) -> u8 {
    if total_scenes == 0 {
        return 1;
    }
    let fraction = position as f64 / total_scenes as f64;
    if fraction < 0.25 {
        1
    } else if fraction < 0.75 {
        2
    } else {
        3
    }
}

#[async_trait]
impl Tool for AnalyzePacingTool<'_> {
    fn name(&self) -> &'static str {
        "analyze_pacing"
    }

    fn description(&self) -> &'static str {
        "Compute quantitative pacing metrics: per-scene and per-act word counts, dialogue ratio, averages, and outlier scenes. No LLM call."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: serde_json::Value) -> String {
        let scenes: Vec<Scene> = match self.db.scripts().all_scenes(self.script_id) {
            Ok(scenes) => scenes,
            Err(e) => return format!("Error: failed to load scenes: {}", e),
        };
        if scenes.is_empty() {
            return "Error: script has no scenes to analyze.".to_string();
        }

        let total = scenes.len();
        let word_counts: Vec<i32> = scenes.iter().map(|s| s.word_count).collect();
        let avg_words = word_counts.iter().sum::<i32>() as f64 / total as f64;
        let std_dev = {
            let variance = word_counts
                .iter()
                .map(|w| (*w as f64 - avg_words).powi(2))
                .sum::<f64>()
                / total as f64;
            variance.sqrt()
        };

        let mut act_word_totals = [0i64; 3];
        let mut act_scene_counts = [0i64; 3];
        let mut outliers = Vec::new();

        for scene in &scenes {
            let act = act_for_position(scene.position, total);
            act_word_totals[(act - 1) as usize] += scene.word_count as i64;
            act_scene_counts[(act - 1) as usize] += 1;

            if (scene.word_count as f64 - avg_words).abs() > 2.0 * std_dev && std_dev > 0.0 {
                outliers.push(format!(
                    "Scene {} (index {}): {} words (avg {:.0})",
                    scene.user_number(),
                    scene.position,
                    scene.word_count,
                    avg_words
                ));
            }
        }

        let total_dialogue_chars: usize = scenes.iter().map(|s| dialogue_char_count(&s.content)).sum();
        let total_chars: usize = scenes.iter().map(|s| s.content.len()).sum();
        let dialogue_ratio = if total_chars > 0 {
            total_dialogue_chars as f64 / total_chars as f64
        } else {
            0.0
        };

        let mut out = format!(
            "Pacing analysis ({} scenes):\n\
             Average scene length: {:.0} words (std dev {:.0})\n\
             Overall dialogue ratio: {:.0}%\n",
            total,
            avg_words,
            std_dev,
            dialogue_ratio * 100.0
        );
        for (i, (words, count)) in act_word_totals.iter().zip(act_scene_counts.iter()).enumerate() {
            if *count > 0 {
                out.push_str(&format!(
                    "Act {}: {} scenes, {} words total, {:.0} avg words/scene\n",
                    i + 1,
                    count,
                    words,
                    *words as f64 / *count as f64
                ));
            }
        }
        if outliers.is_empty() {
            out.push_str("No outlier-length scenes detected.\n");
        } else {
            out.push_str("Outlier-length scenes:\n");
            for o in outliers {
                out.push_str(&format!("- {}\n", o));
            }
        }
        out
    }
}
