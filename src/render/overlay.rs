use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::OverlayStyle;
use crate::episode::model::TextOverlay;
use crate::foundation::core::fmt_num;
use crate::foundation::error::StoryreelResult;
use crate::render::filter::quote_filter_value;

/// Text that has to be on disk before the overlay filter can run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayPayload {
    pub path: PathBuf,
    pub text: String,
}

/// Overlay filter chain plus the payload files it reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayPlan {
    /// `drawtext` filters joined with `,`; `None` when there are no overlays.
    pub filter: Option<String>,
    pub payloads: Vec<OverlayPayload>,
}

/// File name of the `index`-th overlay payload inside the work directory.
pub fn payload_file_name(index: usize) -> String {
    format!("overlay{index}.txt")
}

/// Builds timed `drawtext` filters for the final encode.
///
/// Text never enters the filter string: each overlay's text is written to its own file and
/// referenced with `textfile`.
pub struct TextOverlayComposer<'a> {
    style: &'a OverlayStyle,
}

impl<'a> TextOverlayComposer<'a> {
    pub fn new(style: &'a OverlayStyle) -> Self {
        Self { style }
    }

    /// Filter chain and payloads for `overlays`, in document order. Touches no files.
    pub fn plan(&self, overlays: &[TextOverlay], work_dir: &Path) -> OverlayPlan {
        if overlays.is_empty() {
            return OverlayPlan::default();
        }
        let mut filters = Vec::with_capacity(overlays.len());
        let mut payloads = Vec::with_capacity(overlays.len());
        for (i, overlay) in overlays.iter().enumerate() {
            let path = work_dir.join(payload_file_name(i));
            filters.push(self.drawtext(overlay, &path));
            payloads.push(OverlayPayload {
                path,
                text: overlay.text.clone(),
            });
        }
        OverlayPlan {
            filter: Some(filters.join(",")),
            payloads,
        }
    }

    /// Write every payload file of `plan`.
    pub fn write_payloads(&self, plan: &OverlayPlan) -> StoryreelResult<()> {
        for p in &plan.payloads {
            std::fs::write(&p.path, p.text.as_bytes())
                .with_context(|| format!("write overlay text '{}'", p.path.display()))?;
        }
        Ok(())
    }

    /// Plan the overlays and write their payloads; returns the filter chain, if any.
    pub fn compose(
        &self,
        overlays: &[TextOverlay],
        work_dir: &Path,
    ) -> StoryreelResult<Option<String>> {
        let plan = self.plan(overlays, work_dir);
        self.write_payloads(&plan)?;
        tracing::info!(overlays = plan.payloads.len(), "composed text overlays");
        Ok(plan.filter)
    }

    fn drawtext(&self, overlay: &TextOverlay, payload: &Path) -> String {
        let st = self.style;
        let start = fmt_num(overlay.start);
        let end = fmt_num(overlay.end);
        let ramp = fmt_num(st.ramp_sec);

        let mut f = format!(
            "drawtext=textfile={}:expansion=none",
            quote_filter_value(&payload.to_string_lossy())
        );
        if let Some(font) = &st.font_file {
            f.push_str(&format!(
                ":fontfile={}",
                quote_filter_value(&font.to_string_lossy())
            ));
        }
        f.push_str(&format!(
            ":fontsize={}:fontcolor={}:borderw={}:bordercolor={}",
            st.font_size, st.font_color, st.border_width, st.border_color
        ));
        f.push_str(&format!(
            ":x=(w-text_w)/2:y=h-text_h-{}",
            st.bottom_margin
        ));
        // Ramps overlap on windows shorter than two ramps; alpha then peaks below 1.
        f.push_str(&format!(
            ":enable='between(t,{start},{end})':alpha='clip(min((t-{start})/{ramp},({end}-t)/{ramp}),0,1)'"
        ));
        f
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
