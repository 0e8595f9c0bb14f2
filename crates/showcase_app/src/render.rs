// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain-text frames of the page state.

use crate::page::Page;
use showcase_graph::CfgElement;
use showcase_playback::{Millis, RegionId};

const BYTES_COLOR: [u8; 3] = [251, 191, 36];
const KEYWORD_COLOR: [u8; 3] = [96, 165, 250];
const DIM_COLOR: [u8; 3] = [113, 113, 122];

/// Whether a source line gets keyword highlighting
pub fn is_keyword_line(text: &str) -> bool {
    ["int ", "return ", "while "].iter().any(|k| text.contains(k))
}

/// `[name NN%]`, with the section's visible share
fn section_tag(page: &Page, name: &str, region: RegionId) -> String {
    format!("[{name} {:.0}%]", page.visibility(region) * 100.0)
}

/// Renders page snapshots, optionally with ANSI colors.
pub struct FrameRenderer {
    ansi: bool,
}

impl FrameRenderer {
    /// Create a renderer
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }

    fn paint(&self, text: &str, [r, g, b]: [u8; 3]) -> String {
        if self.ansi {
            format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Render one frame at time `now`
    pub fn render(&self, page: &Page, now: Millis) -> String {
        let mut lines = vec![format!(
            "==== t+{:.1}s scroll {:.0} ====",
            now as f64 / 1000.0,
            page.scroll_top()
        )];
        self.demo_section(page, &mut lines);
        self.stats_section(page, &mut lines);
        self.graph_section(page, &mut lines);
        self.feed_section(page, &mut lines);
        lines.join("\n")
    }

    fn demo_section(&self, page: &Page, lines: &mut Vec<String>) {
        let demo = page.demo();
        let sample = demo
            .selected_sample()
            .map(|s| format!("{} ({}, {})", s.name, s.arch, s.size))
            .unwrap_or_default();
        let tag = section_tag(page, "demo", page.regions().demo);
        lines.push(format!("{tag} {sample}  <{}>", demo.run_label()));

        for item in demo.disassembly().visible().iter() {
            let row = &item.payload;
            lines.push(format!(
                "  {}  {:<22} {}",
                self.paint(&row.addr, DIM_COLOR),
                self.paint(&row.bytes, BYTES_COLOR),
                row.asm
            ));
        }

        let source = demo.source().visible();
        if !source.is_empty() {
            lines.push("  -- decompiled --".to_string());
        }
        for item in source.iter() {
            let line = &item.payload;
            let text = if is_keyword_line(&line.text) {
                self.paint(&line.text, KEYWORD_COLOR)
            } else {
                line.text.clone()
            };
            lines.push(format!("  {}{}", "    ".repeat(line.indent as usize), text));
        }
        if let Some(message) = demo.completion_message() {
            lines.push(format!("  {message}"));
        }
    }

    fn stats_section(&self, page: &Page, lines: &mut Vec<String>) {
        let tiles: Vec<String> = page
            .stats()
            .iter()
            .map(|s| format!("{} {}", s.counter.display(), self.paint(s.label, DIM_COLOR)))
            .collect();
        let tag = section_tag(page, "stats", page.regions().stats);
        lines.push(format!("{tag} {}", tiles.join(" | ")));
    }

    fn graph_section(&self, page: &Page, lines: &mut Vec<String>) {
        let graph = page.graph();
        let reveal = page.graph_reveal();
        let tag = section_tag(page, "cfg", page.regions().graph);
        lines.push(format!("{tag} {} {}/{}", graph.name, reveal.visible_count(), reveal.len()));

        for item in reveal.visible().iter() {
            match item.payload {
                CfgElement::Block(id) => {
                    if let Some(block) = graph.block(id) {
                        let exit = if block.exit { " exit" } else { "" };
                        lines.push(format!(
                            "  {id} L{} {} rows{exit}",
                            block.layer,
                            block.len()
                        ));
                    }
                }
                CfgElement::Edge(id) => {
                    if let Some(edge) = graph.edge(id) {
                        let back = if edge.is_back_edge() { " (back)" } else { "" };
                        lines.push(format!(
                            "    {} -> {} {}{back}",
                            edge.from,
                            edge.to,
                            edge.kind.name()
                        ));
                    }
                }
            }
        }
    }

    fn feed_section(&self, page: &Page, lines: &mut Vec<String>) {
        let tag = section_tag(page, "feed", page.regions().feed);
        let log = page.feed().log();
        lines.push(format!("{tag} {}/{}", log.len(), log.capacity()));
        let palette = page.palette();
        for entry in log.iter() {
            let style = palette.style(entry.category);
            lines.push(format!(
                "  {}  {}  {}",
                self.paint(&entry.timestamp, DIM_COLOR),
                self.paint(&format!("{:<9}", style.label), style.color),
                entry.detail
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::tests::mounted_page;
    use showcase_playback::VirtualClock;

    #[test]
    fn test_keyword_lines() {
        assert!(is_keyword_line("int sum = 0;"));
        assert!(is_keyword_line("while (i <= 10) {"));
        assert!(is_keyword_line("return sum;"));
        assert!(!is_keyword_line("sum += i;"));
        assert!(!is_keyword_line("}"));
    }

    #[test]
    fn test_frame_after_full_run() {
        let clock = VirtualClock::shared();
        let (viewport, page) = mounted_page(&clock);
        viewport.scroll_to(1300.0);
        clock.advance(1000 + 11 * 150 + 3800);

        let frame = FrameRenderer::new(false).render(&page, 6450);
        assert!(frame.starts_with("==== t+6.5s scroll 1300 ===="));
        assert!(frame.contains("[demo 0%] libcrypto.so.3 (x86_64, 4.2 MB)  <Run Decompilation>"));
        assert!(frame.contains("00401026  c9 c3"));
        assert!(frame.contains("        sum += i;"));
        assert!(frame.contains("Decompilation complete — 2,847 functions recovered"));
        assert!(frame.contains("[cfg 100%] compute_sum 7/7"));
        assert!(frame.contains("[feed 0%] 2/8"));
        assert!(frame.contains("loc_401017 -> loc_401011 jump (back)"));
        let labels = ["DECOMPILE", "ANALYZE", "XREF", "CFG ", "PATCH"];
        assert!(labels.iter().any(|l| frame.contains(l)));
        assert!(!frame.contains('\x1b'));
    }

    #[test]
    fn test_ansi_highlight() {
        let clock = VirtualClock::shared();
        let (_viewport, page) = mounted_page(&clock);
        clock.advance(1000 + 11 * 150 + 800);

        let frame = FrameRenderer::new(true).render(&page, 0);
        assert!(frame.contains("\x1b[38;2;96;165;250mint compute_sum(void) {\x1b[0m"));
    }
}
