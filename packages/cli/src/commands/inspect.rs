use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use odfkit_editor::odf_utils::{inline_root, is_paragraph};
use odfkit_editor::OdtDocument;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// ODF document (flat XML) to inspect
    pub document: PathBuf,
}

/// Steps covered by one body paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSteps {
    pub first: usize,
    pub last: usize,
    pub text: String,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = fs::read_to_string(&args.document)
        .with_context(|| format!("Cannot read document {}", args.document.display()))?;
    let document = OdtDocument::from_xml(&source, config.editor)?;

    println!("{}", args.document.display().to_string().bright_blue().bold());
    println!("Last step: {}", document.step_count());
    for paragraph in paragraph_steps(&document)? {
        println!(
            "  {} {}",
            format!("[{}..={}]", paragraph.first, paragraph.last).dimmed(),
            paragraph.text
        );
    }
    Ok(())
}

/// Step ranges of the paragraphs outside annotations, in document order.
pub fn paragraph_steps(document: &OdtDocument) -> Result<Vec<ParagraphSteps>> {
    let tree = document.tree();
    let mut paragraphs = Vec::new();
    for node in tree.descendants(document.body()) {
        if !is_paragraph(tree, node) || inline_root(tree, node).is_some() {
            continue;
        }
        let first = document.paragraph_start_step(node)?;
        let count = document.paragraph_step_count(node);
        paragraphs.push(ParagraphSteps {
            first,
            last: first + count.saturating_sub(1),
            text: tree.text_content(node),
        });
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odfkit_dom::ns;
    use odfkit_editor::EditorConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paragraph_steps() {
        let source = format!(
            r#"<office:document xmlns:office="{}" xmlns:text="{}"><office:body><office:text><text:p>ab</text:p><text:p/><text:h>xyz</text:h></office:text></office:body></office:document>"#,
            ns::OFFICE,
            ns::TEXT
        );
        let document = OdtDocument::from_xml(&source, EditorConfig::default()).unwrap();

        let ranges: Vec<(usize, usize)> = paragraph_steps(&document)
            .unwrap()
            .iter()
            .map(|paragraph| (paragraph.first, paragraph.last))
            .collect();
        assert_eq!(ranges, vec![(0, 2), (3, 3), (4, 7)]);
    }
}
