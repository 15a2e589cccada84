use crate::backend::{ChatMessage, TextBackend};
use crate::error::{AppError, Result};
use crate::progress::ProgressReporter;
use crate::prompts::PromptBuilder;
use std::fs;
use std::path::Path;

const SECTION_SEPARATOR: &str = "\n\n";

pub struct DocWriter<'a, B: TextBackend> {
    backend: B,
    prompts: &'a PromptBuilder,
    parts: usize,
}

impl<'a, B: TextBackend> DocWriter<'a, B> {
    pub fn new(backend: B, prompts: &'a PromptBuilder) -> Self {
        Self {
            backend,
            prompts,
            parts: 1,
        }
    }

    // Rounds after the first ask the backend to continue its previous answer
    pub fn with_parts(mut self, parts: usize) -> Self {
        self.parts = parts.max(1);
        self
    }

    pub fn generate(&self, progress: &mut dyn ProgressReporter) -> Result<String> {
        progress.start(self.parts + self.prompts.file_count());
        let main_doc = self.write_main_doc(progress)?;
        let deep_doc = self.write_deep_doc(progress)?;
        progress.finish();
        Ok(format!("{}{}{}", main_doc, SECTION_SEPARATOR, deep_doc))
    }

    pub fn write_main_doc(&self, progress: &mut dyn ProgressReporter) -> Result<String> {
        let mut conversation = vec![ChatMessage::user(self.prompts.main_prompt())];
        let mut sections = Vec::with_capacity(self.parts);

        for part in 0..self.parts {
            if part > 0 {
                conversation.push(ChatMessage::user(self.prompts.continuation_prompt()));
            }
            log::info!("Requesting main documentation part {}/{}", part + 1, self.parts);
            let answer = self.backend.complete(&conversation)?;
            conversation.push(ChatMessage::assistant(answer.clone()));
            sections.push(answer);
            progress.advance(&format!("Main documentation ({}/{})", part + 1, self.parts));
        }

        Ok(sections.join(SECTION_SEPARATOR))
    }

    pub fn write_deep_doc(&self, progress: &mut dyn ProgressReporter) -> Result<String> {
        let mut full_response = String::new();
        for file_prompt in self.prompts.file_prompts() {
            log::info!("Requesting documentation for {}", file_prompt.relative_path);
            let answer = self
                .backend
                .complete(&[ChatMessage::user(file_prompt.prompt)])?;
            full_response.push_str(&answer);
            full_response.push_str(SECTION_SEPARATOR);
            progress.advance(&file_prompt.relative_path);
        }
        Ok(full_response)
    }
}

pub fn save_doc(doc: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, doc).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::info!("Documentation written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, Role};
    use crate::gather::{TraversalResult, traverse};
    use crate::progress::RecordingProgress;
    use crate::prompts::Language;
    use crate::rules::IgnoreRules;
    use tempfile::TempDir;

    fn project() -> (TempDir, TraversalResult) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.py"), "y = 2").unwrap();
        let result = traverse(dir.path(), &IgnoreRules::default()).unwrap();
        (dir, result)
    }

    fn mock() -> MockBackend {
        let mut mock = MockBackend::new();
        mock.add_response("main idea", "MAIN");
        mock.add_response("continue from where you left off", "MORE");
        mock.add_response("for the file a.py", "DOC A");
        mock.add_response("for the file b.py", "DOC B");
        mock
    }

    #[test]
    fn document_joins_main_and_file_sections() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let backend = mock();
        let doc = DocWriter::new(&backend, &prompts)
            .generate(&mut RecordingProgress::default())
            .unwrap();
        assert_eq!(doc, "MAIN\n\nDOC A\n\nDOC B\n\n");
    }

    #[test]
    fn continuation_rounds_carry_the_conversation() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let backend = mock();
        let main = DocWriter::new(&backend, &prompts)
            .with_parts(2)
            .write_main_doc(&mut RecordingProgress::default())
            .unwrap();
        assert_eq!(main, "MAIN\n\nMORE");

        let calls = backend.calls();
        let roles: Vec<Role> = calls[1].iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(calls[1][1].content, "MAIN");
    }

    #[test]
    fn file_prompts_are_sent_as_fresh_conversations() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let backend = mock();
        DocWriter::new(&backend, &prompts)
            .write_deep_doc(&mut RecordingProgress::default())
            .unwrap();
        assert!(backend.calls().iter().all(|call| call.len() == 1));
    }

    #[test]
    fn progress_counts_every_backend_call() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let backend = mock();
        let mut progress = RecordingProgress::default();
        DocWriter::new(&backend, &prompts)
            .with_parts(3)
            .generate(&mut progress)
            .unwrap();
        assert_eq!(progress.total, Some(5));
        assert_eq!(progress.labels.len(), 5);
        assert_eq!(progress.labels[3], "a.py");
        assert!(progress.finished);
    }

    #[test]
    fn dry_run_sections_name_their_own_file() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let doc = DocWriter::new(MockBackend::echo(), &prompts)
            .generate(&mut RecordingProgress::default())
            .unwrap();
        let sections: Vec<&str> = doc.split(SECTION_SEPARATOR).filter(|s| !s.is_empty()).collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].contains("main idea"));
        assert!(sections[1].ends_with("for the file a.py."));
        assert!(sections[2].ends_with("for the file b.py."));
    }

    #[test]
    fn backend_failure_aborts_generation() {
        let (_dir, result) = project();
        let prompts = PromptBuilder::new(&result, Language::En, "demo");
        let err = DocWriter::new(MockBackend::with_failure(), &prompts)
            .generate(&mut RecordingProgress::default())
            .unwrap_err();
        assert!(matches!(err, AppError::BackendRequest(_)));
    }

    #[test]
    fn save_doc_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out/docs/documentation.md");
        save_doc("# Title", &target).unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "# Title");
    }
}
