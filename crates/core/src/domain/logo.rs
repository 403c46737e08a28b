use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogoSize {
    Small,
    Medium,
    Large,
    #[serde(rename = "Extra Large")]
    ExtraLarge,
}

impl LogoSize {
    pub const ALL: [LogoSize; 4] =
        [LogoSize::Small, LogoSize::Medium, LogoSize::Large, LogoSize::ExtraLarge];

    pub fn label(&self) -> &'static str {
        match self {
            LogoSize::Small => "Small",
            LogoSize::Medium => "Medium",
            LogoSize::Large => "Large",
            LogoSize::ExtraLarge => "Extra Large",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DecorationMethod {
    #[serde(rename = "3D Embroidery")]
    ThreeDEmbroidery,
    #[serde(rename = "Flat Embroidery")]
    FlatEmbroidery,
    #[serde(rename = "Laser Cut")]
    LaserCut,
    #[serde(rename = "Rubber Patch")]
    RubberPatch,
    #[serde(rename = "Leather Patch")]
    LeatherPatch,
    #[serde(rename = "Woven Patch")]
    WovenPatch,
    #[serde(rename = "Printed Patch")]
    PrintedPatch,
    #[serde(rename = "Screen Print")]
    ScreenPrint,
}

impl DecorationMethod {
    pub const ALL: [DecorationMethod; 8] = [
        DecorationMethod::ThreeDEmbroidery,
        DecorationMethod::FlatEmbroidery,
        DecorationMethod::LaserCut,
        DecorationMethod::RubberPatch,
        DecorationMethod::LeatherPatch,
        DecorationMethod::WovenPatch,
        DecorationMethod::PrintedPatch,
        DecorationMethod::ScreenPrint,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DecorationMethod::ThreeDEmbroidery => "3D Embroidery",
            DecorationMethod::FlatEmbroidery => "Flat Embroidery",
            DecorationMethod::LaserCut => "Laser Cut",
            DecorationMethod::RubberPatch => "Rubber Patch",
            DecorationMethod::LeatherPatch => "Leather Patch",
            DecorationMethod::WovenPatch => "Woven Patch",
            DecorationMethod::PrintedPatch => "Printed Patch",
            DecorationMethod::ScreenPrint => "Screen Print",
        }
    }

    /// Molded patches need a one-time tooling charge per distinct pattern.
    pub fn requires_mold(&self) -> bool {
        matches!(self, DecorationMethod::RubberPatch | DecorationMethod::LeatherPatch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationMethod {
    Direct,
    Run,
    Velcro,
    Satin,
}

impl ApplicationMethod {
    pub const ALL: [ApplicationMethod; 4] = [
        ApplicationMethod::Direct,
        ApplicationMethod::Run,
        ApplicationMethod::Velcro,
        ApplicationMethod::Satin,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationMethod::Direct => "Direct",
            ApplicationMethod::Run => "Run",
            ApplicationMethod::Velcro => "Velcro",
            ApplicationMethod::Satin => "Satin",
        }
    }
}

/// A logo with exactly one value on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLogo {
    pub decoration_method: DecorationMethod,
    pub size: LogoSize,
    pub application_method: ApplicationMethod,
}

impl ResolvedLogo {
    pub const DEFAULT_DECORATION: DecorationMethod = DecorationMethod::FlatEmbroidery;
    pub const DEFAULT_SIZE: LogoSize = LogoSize::Medium;
    pub const DEFAULT_APPLICATION: ApplicationMethod = ApplicationMethod::Direct;

    pub fn new(
        decoration_method: DecorationMethod,
        size: LogoSize,
        application_method: ApplicationMethod,
    ) -> Self {
        Self { decoration_method, size, application_method }
    }

    /// Name of the three-axis logo price table for this combination.
    pub fn table_name(&self) -> String {
        logo_table_name(self.decoration_method, self.size, self.application_method)
    }

    pub fn mold_table_name(&self) -> String {
        mold_table_name(self.size)
    }
}

impl Default for ResolvedLogo {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DECORATION, Self::DEFAULT_SIZE, Self::DEFAULT_APPLICATION)
    }
}

impl fmt::Display for ResolvedLogo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.decoration_method.label(),
            self.size.label(),
            self.application_method.label()
        )
    }
}

pub fn logo_table_name(
    decoration: DecorationMethod,
    size: LogoSize,
    application: ApplicationMethod,
) -> String {
    format!("{} | {} | {}", decoration.label(), size.label(), application.label())
}

pub fn mold_table_name(size: LogoSize) -> String {
    format!("Mold Charge | {}", size.label())
}

/// Separately supplied structured fields that accompany a composite descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoHints {
    pub decoration_method: Option<String>,
    pub size: Option<String>,
    pub application_method: Option<String>,
}

impl LogoHints {
    pub fn is_empty(&self) -> bool {
        self.decoration_method.is_none() && self.size.is_none() && self.application_method.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLogo {
    pub raw_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "LogoHints::is_empty")]
    pub hints: LogoHints,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogoDescriptor {
    Simple(ResolvedLogo),
    Composite(CompositeLogo),
}

impl Default for LogoDescriptor {
    fn default() -> Self {
        Self::Simple(ResolvedLogo::default())
    }
}

impl LogoDescriptor {
    pub fn composite(raw: &str) -> Self {
        Self::Composite(CompositeLogo {
            raw_tokens: vec![raw.to_string()],
            hints: LogoHints::default(),
        })
    }
}

/// A logo placed at a named position on the cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSpec {
    pub position: String,
    #[serde(default)]
    pub descriptor: LogoDescriptor,
}

impl LogoSpec {
    pub fn new(position: impl Into<String>, descriptor: LogoDescriptor) -> Self {
        Self { position: position.into(), descriptor }
    }

    pub fn simple(
        position: impl Into<String>,
        decoration_method: DecorationMethod,
        size: LogoSize,
        application_method: ApplicationMethod,
    ) -> Self {
        Self::new(
            position,
            LogoDescriptor::Simple(ResolvedLogo::new(decoration_method, size, application_method)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApplicationMethod, DecorationMethod, LogoDescriptor, LogoSize, LogoSpec, ResolvedLogo,
    };

    #[test]
    fn table_names_cover_all_three_axes() {
        let logo = ResolvedLogo::new(
            DecorationMethod::LaserCut,
            LogoSize::Large,
            ApplicationMethod::Direct,
        );
        assert_eq!(logo.table_name(), "Laser Cut | Large | Direct");
        assert_eq!(logo.mold_table_name(), "Mold Charge | Large");
        assert_eq!(logo.to_string(), "Laser Cut, Large, Direct");
    }

    #[test]
    fn only_molded_patches_require_tooling() {
        let molded =
            DecorationMethod::ALL.iter().filter(|method| method.requires_mold()).count();
        assert_eq!(molded, 2);
        assert!(!DecorationMethod::WovenPatch.requires_mold());
    }

    #[test]
    fn logo_spec_serializes_tagged_descriptor() {
        let spec = LogoSpec::simple(
            "Front",
            DecorationMethod::ThreeDEmbroidery,
            LogoSize::ExtraLarge,
            ApplicationMethod::Run,
        );
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["descriptor"]["kind"], "simple");
        assert_eq!(json["descriptor"]["decorationMethod"], "3D Embroidery");
        assert_eq!(json["descriptor"]["size"], "Extra Large");

        let back: LogoSpec = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, spec);
    }

    #[test]
    fn position_only_logo_gets_default_descriptor() {
        let spec: LogoSpec = serde_json::from_str(r#"{"position":"Back"}"#).expect("parse");
        assert_eq!(spec.descriptor, LogoDescriptor::default());
    }
}
