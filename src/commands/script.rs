//! Practice script and dialogue line commands.

use super::{Deleted, Output, Toggled, format_local, json, open_store, resolve_id, short_id};
use crate::models::{PracticeDialogue, PracticeScript, PracticeScriptDraft, Speaker};
use crate::storage::DialogueLine;
use crate::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct ScriptRecord {
    #[serde(flatten)]
    pub script: PracticeScript,
    pub lines: Vec<PracticeDialogue>,
}

impl Output for ScriptRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let s = &self.script;
        let mut lines = vec![format!(
            "{} {}{} [{}]",
            short_id(&s.id),
            s.title,
            if s.is_favorite { " ★" } else { "" },
            s.event_type
        )];
        if !s.description.is_empty() {
            lines.push(format!("  {}", s.description));
        }
        let last = s
            .last_practiced_at
            .as_ref()
            .map(format_local)
            .unwrap_or_else(|| "never".to_string());
        lines.push(format!(
            "  Practiced {} time(s), last: {}",
            s.practice_count, last
        ));
        if self.lines.is_empty() {
            lines.push("  (no lines)".to_string());
        }
        for line in &self.lines {
            lines.push(format!(
                "  {:>2}. {:<11} {}  ({})",
                line.order + 1,
                line.speaker,
                line.content,
                short_id(&line.id)
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct ScriptSummary {
    #[serde(flatten)]
    pub script: PracticeScript,
    pub line_count: u32,
}

#[derive(Serialize)]
pub struct ScriptList {
    pub scripts: Vec<ScriptSummary>,
    pub count: usize,
}

impl Output for ScriptList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.scripts.is_empty() {
            return "No practice scripts.".to_string();
        }
        let mut lines = vec![format!("{} script(s):", self.count)];
        for entry in &self.scripts {
            let s = &entry.script;
            lines.push(format!(
                "  {} {}{} [{}] {} line(s), practiced {}x",
                short_id(&s.id),
                s.title,
                if s.is_favorite { " ★" } else { "" },
                s.event_type,
                entry.line_count,
                s.practice_count
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct LineRecord {
    pub line: PracticeDialogue,
}

impl Output for LineRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Added line {} ({}) as #{}: {}",
            short_id(&self.line.id),
            self.line.speaker,
            self.line.order + 1,
            self.line.content
        )
    }
}

pub fn script_add(data_dir: &Path, draft: PracticeScriptDraft) -> Result<ScriptRecord> {
    let mut store = open_store(data_dir)?;
    let script = store.create::<PracticeScript>(draft)?;
    Ok(ScriptRecord {
        script,
        lines: Vec::new(),
    })
}

/// List scripts, favorites first, then by title.
pub fn script_list(data_dir: &Path, favorites_only: bool) -> Result<ScriptList> {
    let store = open_store(data_dir)?;
    let filter = |s: &PracticeScript| !favorites_only || s.is_favorite;
    let order = |a: &PracticeScript, b: &PracticeScript| {
        b.is_favorite
            .cmp(&a.is_favorite)
            .then_with(|| a.title.cmp(&b.title))
    };
    let scripts = store.query::<PracticeScript>(Some(&filter), Some(&order))?;

    let scripts = scripts
        .into_iter()
        .map(|script| {
            let line_count = store.child_count::<PracticeDialogue>(script.id)?;
            Ok(ScriptSummary { script, line_count })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ScriptList {
        count: scripts.len(),
        scripts,
    })
}

pub fn script_show(data_dir: &Path, id: &str) -> Result<ScriptRecord> {
    let store = open_store(data_dir)?;
    let id = resolve_id::<PracticeScript>(&store, id)?;
    Ok(ScriptRecord {
        script: store.get(id)?,
        lines: store.children(id)?,
    })
}

pub fn script_favorite(data_dir: &Path, id: &str) -> Result<Toggled> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<PracticeScript>(&store, id)?;
    let value = store.relations().toggle_favorite(id)?;
    Ok(Toggled {
        id,
        field: "is_favorite",
        value,
    })
}

/// Delete a script together with all of its lines.
pub fn script_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<PracticeScript>(&store, id)?;
    store.get::<PracticeScript>(id)?;
    let removed = store.relations().delete_script(id)?;
    Ok(Deleted {
        id,
        kind: "script".to_string(),
        children_deleted: Some(removed),
    })
}

/// Parse `speaker: text`. A line without a recognised speaker prefix is
/// spoken by the user. Blank text, with or without a prefix, gives an empty
/// line, which a replace skips while keeping its position.
pub fn parse_line(input: &str) -> DialogueLine {
    if let Some((prefix, text)) = input.split_once(':') {
        if let Ok(speaker) = prefix.parse::<Speaker>() {
            return DialogueLine::new(speaker, text.trim());
        }
    }
    DialogueLine::new(Speaker::User, input.trim())
}

/// Replace every line of a script.
pub fn script_lines(data_dir: &Path, id: &str, lines: &[String]) -> Result<ScriptRecord> {
    let lines: Vec<DialogueLine> = lines.iter().map(|line| parse_line(line)).collect();

    let mut store = open_store(data_dir)?;
    let id = resolve_id::<PracticeScript>(&store, id)?;
    let lines = store.relations().replace_dialogues(id, lines)?;
    Ok(ScriptRecord {
        script: store.get(id)?,
        lines,
    })
}

pub fn line_add(
    data_dir: &Path,
    script_id: &str,
    speaker: Speaker,
    content: &str,
) -> Result<LineRecord> {
    let mut store = open_store(data_dir)?;
    let script_id = resolve_id::<PracticeScript>(&store, script_id)?;
    let line = store.relations().add_dialogue(script_id, speaker, content)?;
    Ok(LineRecord { line })
}

pub fn line_delete(data_dir: &Path, id: &str) -> Result<Deleted> {
    let mut store = open_store(data_dir)?;
    let id = resolve_id::<PracticeDialogue>(&store, id)?;
    store.relations().delete_dialogue(id)?;
    Ok(Deleted {
        id,
        kind: "line".to_string(),
        children_deleted: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::commands::init;
    use crate::test_utils::TestEnv;

    fn new_script(env: &TestEnv, title: &str, favorite: bool) -> PracticeScript {
        script_add(
            env.data_path(),
            PracticeScriptDraft {
                title: Some(title.to_string()),
                is_favorite: Some(favorite),
                ..Default::default()
            },
        )
        .unwrap()
        .script
    }

    #[test]
    fn test_parse_line() {
        let line = parse_line("counterpart: Thanks for coming!");
        assert_eq!(line.speaker, Speaker::Counterpart);
        assert_eq!(line.content, "Thanks for coming!");

        let line = parse_line("Time: 3 minutes");
        assert_eq!(line.speaker, Speaker::User);
        assert_eq!(line.content, "Time: 3 minutes");

        assert!(parse_line("   ").content.is_empty());
        assert!(parse_line("me:").content.is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped_alike() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let script = new_script(&env, "Signing", false);

        let shown = script_lines(
            env.data_path(),
            &script.id.to_string(),
            &[
                "self: Hi!".to_string(),
                "".to_string(),
                "me:".to_string(),
                "counterpart: Hello!".to_string(),
            ],
        )
        .unwrap();
        let orders: Vec<u32> = shown.lines.iter().map(|l| l.order).collect();
        assert_eq!(orders, vec![0, 3]);
    }

    #[test]
    fn test_lines_replace_and_show() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let script = new_script(&env, "First handshake", false);

        let shown = script_lines(
            env.data_path(),
            &script.id.to_string(),
            &["self: Hi!".to_string(), "counterpart: Hello!".to_string()],
        )
        .unwrap();
        assert_eq!(shown.lines.len(), 2);
        assert_eq!(shown.lines[1].speaker, Speaker::Counterpart);

        let added = line_add(env.data_path(), &script.id.to_string(), Speaker::User, "Bye!").unwrap();
        assert_eq!(added.line.order, 2);

        line_delete(env.data_path(), &shown.lines[0].id.to_string()).unwrap();
        let shown = script_show(env.data_path(), &script.id.to_string()).unwrap();
        let orders: Vec<u32> = shown.lines.iter().map(|l| l.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(shown.lines[0].content, "Hello!");
    }

    #[test]
    fn test_list_favorites_first_with_counts() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        new_script(&env, "B plain", false);
        let fav = new_script(&env, "Z favorite", true);
        line_add(env.data_path(), &fav.id.to_string(), Speaker::User, "Hi").unwrap();

        let list = script_list(env.data_path(), false).unwrap();
        assert_eq!(list.scripts[0].script.title, "Z favorite");
        assert_eq!(list.scripts[0].line_count, 1);

        let favorites = script_list(env.data_path(), true).unwrap();
        assert_eq!(favorites.count, 1);
    }

    #[test]
    fn test_delete_cascades_lines() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();
        let script = new_script(&env, "Signing", false);
        line_add(env.data_path(), &script.id.to_string(), Speaker::User, "Hi").unwrap();
        line_add(env.data_path(), &script.id.to_string(), Speaker::Counterpart, "Hello").unwrap();

        let deleted = script_delete(env.data_path(), &script.id.to_string()).unwrap();
        assert_eq!(deleted.children_deleted, Some(2));
        assert!(matches!(
            script_show(env.data_path(), &script.id.to_string()),
            Err(Error::NotFound(_))
        ));
    }
}
