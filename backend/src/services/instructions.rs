//! Instruction files for the telescope driver.
//!
//! A plan is rendered as a short line-oriented program dropped in the
//! orchestration folder. The driver executes it and moves a report whose name
//! contains the same stem and `.ORC` into `done/` or `done/Errors/`.

use qtty::Seconds;

use crate::api::{ObservationPlan, PlanId};
use crate::config::OrchestrationSettings;
use crate::services::coordinates::format_driver_radec;

/// Column width of the command field.
const COMMAND_WIDTH: usize = 14;

/// Report files carry this marker in their names.
const REPORT_MARKER: &str = ".ORC";

/// Settle times written as `WaitFor` lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleTimes {
    pub slew: Seconds,
    pub filter: Seconds,
    pub frame: Seconds,
}

impl From<&OrchestrationSettings> for SettleTimes {
    fn from(settings: &OrchestrationSettings) -> Self {
        Self {
            slew: Seconds::new(settings.slew_wait_s),
            filter: Seconds::new(settings.filter_wait_s),
            frame: Seconds::new(settings.frame_wait_s),
        }
    }
}

/// Driver commands, in the spelling the driver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SlewToRaDec,
    SlewToObject,
    SetFrameMode,
    WaitFor,
    SetFilter,
    TakeImage,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::SlewToRaDec => "SlewToRaDec",
            Command::SlewToObject => "SlewToObject",
            Command::SetFrameMode => "SetFrameMode",
            Command::WaitFor => "WaitFor",
            Command::SetFilter => "SetFilter",
            Command::TakeImage => "TakeImage",
        }
    }
}

fn line(out: &mut String, command: Command, arg: impl std::fmt::Display) {
    out.push_str(&format!(
        "{:<width$}, {}         ,\n",
        command.as_str(),
        arg,
        width = COMMAND_WIDTH
    ));
}

/// Render `plan` as driver instructions.
///
/// Output depends only on the plan and the settle times: one slew, the frame
/// mode, a slew settle, then `SetFilter` / `WaitFor` / `TakeImage` for every
/// filter in stored order, and a closing frame settle.
pub fn build_instructions(plan: &ObservationPlan, settle: &SettleTimes) -> String {
    let mut out = String::new();

    match &plan.object_name {
        Some(object) => line(&mut out, Command::SlewToObject, object),
        None => line(
            &mut out,
            Command::SlewToRaDec,
            format_driver_radec(plan.ra, plan.dec),
        ),
    }
    line(&mut out, Command::SetFrameMode, &plan.frame_mode);
    line(&mut out, Command::WaitFor, settle.slew.value());

    for filter in &plan.filters {
        line(&mut out, Command::SetFilter, filter);
        line(&mut out, Command::WaitFor, settle.filter.value());
        line(&mut out, Command::TakeImage, plan.exposure.value());
    }

    line(&mut out, Command::WaitFor, settle.frame.value());
    out
}

/// File naming shared by the instruction file and the driver's reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrchestrationName(String);

impl OrchestrationName {
    /// Zero-padded plan id, six digits.
    pub fn for_plan(id: PlanId) -> Self {
        OrchestrationName(format!("{:06}", id.value()))
    }

    pub fn stem(&self) -> &str {
        &self.0
    }

    /// Name of the instruction file written to the folder.
    pub fn instruction_file(&self) -> String {
        format!("{}.txt", self.0)
    }

    /// Whether a file in the orchestration folder belongs to this plan:
    /// the stem followed by an extension.
    pub fn matches_pending(&self, file: &str) -> bool {
        file.strip_prefix(self.0.as_str()).is_some_and(|rest| rest.starts_with('.'))
    }

    /// Whether a file in `done/` or `done/Errors/` reports on this plan.
    pub fn matches_report(&self, file: &str) -> bool {
        self.matches_pending(file) && file.contains(REPORT_MARKER)
    }
}

impl std::fmt::Display for OrchestrationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Output image names listed in a driver report, in file order.
///
/// `TakeImage` lines carry the exposure followed by the output path, either
/// comma separated or whitespace separated. Only the base name is kept.
pub fn parse_done_outputs(report: &str) -> Vec<String> {
    report
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with(Command::TakeImage.as_str()))
        .filter_map(|l| {
            let by_comma: Vec<&str> = l.split(',').map(str::trim).collect();
            let path = if by_comma.len() > 2 {
                by_comma[2..].iter().copied().find(|f| !f.is_empty())
            } else {
                None
            };
            let path = path.or_else(|| {
                l.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                    .nth(2)
            })?;
            let name = basename(path);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Outputs as stored on the plan.
pub fn join_outputs(outputs: &[String]) -> Option<String> {
    (!outputs.is_empty()).then(|| outputs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FrameMode, UserId};
    use chrono::{TimeZone, Utc};
    use qtty::Degrees;

    fn plan() -> ObservationPlan {
        ObservationPlan {
            id: PlanId::new(7),
            owner: UserId::new(1),
            name: Some("M42".into()),
            object_name: None,
            ra: Degrees::new(83.82),
            dec: Degrees::new(-5.39),
            filters: vec!["R".into(), "G".into(), "B".into()],
            frame_mode: FrameMode::new("Light"),
            exposure: Seconds::new(30.0),
            start_time: Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap(),
            executed: false,
            executed_at: None,
            outputs: None,
        }
    }

    fn settle() -> SettleTimes {
        SettleTimes {
            slew: Seconds::new(10.0),
            filter: Seconds::new(5.0),
            frame: Seconds::new(2.5),
        }
    }

    #[test]
    fn test_instruction_layout() {
        let text = build_instructions(&plan(), &settle());
        let expected = "\
SlewToRaDec   , 5.58800h -5.39000d         ,
SetFrameMode  , Light         ,
WaitFor       , 10         ,
SetFilter     , R         ,
WaitFor       , 5         ,
TakeImage     , 30         ,
SetFilter     , G         ,
WaitFor       , 5         ,
TakeImage     , 30         ,
SetFilter     , B         ,
WaitFor       , 5         ,
TakeImage     , 30         ,
WaitFor       , 2.5         ,
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_named_object_slews_by_name() {
        let mut p = plan();
        p.object_name = Some("Jupiter".into());
        let text = build_instructions(&p, &settle());
        assert!(text.starts_with("SlewToObject  , Jupiter         ,\n"));
    }

    #[test]
    fn test_one_take_image_per_filter_in_order() {
        let mut p = plan();
        p.filters = vec!["B".into(), "L".into()];
        let text = build_instructions(&p, &settle());
        let filters: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("SetFilter"))
            .map(|l| l.split(',').nth(1).unwrap().trim())
            .collect();
        assert_eq!(filters, vec!["B", "L"]);
        assert_eq!(text.lines().filter(|l| l.starts_with("TakeImage")).count(), 2);
    }

    #[test]
    fn test_deterministic_output() {
        assert_eq!(
            build_instructions(&plan(), &settle()),
            build_instructions(&plan(), &settle())
        );
    }

    #[test]
    fn test_orchestration_name() {
        let name = OrchestrationName::for_plan(PlanId::new(42));
        assert_eq!(name.stem(), "000042");
        assert_eq!(name.instruction_file(), "000042.txt");
        assert!(name.matches_pending("000042.txt"));
        assert!(!name.matches_pending("000043.txt"));
        assert!(name.matches_report("000042.txt.ORC"));
        assert!(name.matches_report("000042.ORC.txt"));
        assert!(!name.matches_report("000042.txt"));
    }

    #[test]
    fn test_longer_plan_ids_do_not_match_shorter_stems() {
        let name = OrchestrationName::for_plan(PlanId::new(1));
        assert_eq!(name.stem(), "000001");
        assert!(!name.matches_pending("1000001.txt"));
        assert!(!name.matches_pending("0000012.txt"));
        assert!(!name.matches_report("1000001.txt.ORC"));
        assert!(!name.matches_report("0000010.txt.ORC"));
        assert!(name.matches_report("000001.txt.ORC"));
    }

    #[test]
    fn test_parse_done_outputs() {
        let report = "\
SlewToRaDec   , 5.58800h -5.39000d         ,
TakeImage     , 30         , C:\\Images\\2024\\M42_R_001.fits
SetFilter     , G         ,
TakeImage 30 /data/images/M42_G_001.fits
TakeImage     , 30         ,
";
        let outputs = parse_done_outputs(report);
        assert_eq!(outputs, vec!["M42_R_001.fits", "M42_G_001.fits"]);
        assert_eq!(
            join_outputs(&outputs).as_deref(),
            Some("M42_R_001.fits, M42_G_001.fits")
        );
        assert_eq!(join_outputs(&[]), None);
    }
}
