//! Build variant properties and best-output selection
//!
//! A Gradle build can split one variant into several `.apk` files, each
//! restricted to an ABI and/or screen density. Given what a device supports,
//! [`select_best_output`] picks the one to install.

use serde::{Deserialize, Serialize};

/// Kind of split an output filter restricts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(rename = "ABI")]
    Abi,
    #[serde(rename = "DENSITY")]
    Density,
    /// Split kinds madb does not inspect (e.g. LANGUAGE); always satisfied
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFilter {
    pub filter_type: FilterType,
    pub identifier: String,
}

/// One `.apk` produced for a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOutput {
    pub name: String,
    pub output_file_path: String,
    /// Higher is newer
    pub version_code: i64,
    #[serde(default)]
    pub filters: Vec<OutputFilter>,
}

/// Everything madb needs to know about one module/variant of a Gradle project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantProperties {
    pub app_id: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub abi_filters: Vec<String>,
    #[serde(default)]
    pub assemble_task: String,
    #[serde(default)]
    pub variant_outputs: Vec<VariantOutput>,
}

/// Resource qualifier for a numeric screen density, e.g. 160 -> "mdpi"
pub fn density_bucket(density: u32) -> String {
    let name = match density {
        0 => "anydpi",
        120 => "ldpi",
        160 => "mdpi",
        213 => "tvdpi",
        240 => "hdpi",
        320 => "xhdpi",
        480 => "xxhdpi",
        640 => "xxxhdpi",
        other => return format!("{other}dpi"),
    };
    name.to_string()
}

/// Whether every filter of `output` is satisfied by the device
pub fn output_matches(output: &VariantOutput, device_abis: &[String], bucket: &str) -> bool {
    output.filters.iter().all(|filter| match filter.filter_type {
        FilterType::Abi => device_abis.iter().any(|abi| *abi == filter.identifier),
        FilterType::Density => filter.identifier == bucket,
        FilterType::Other => true,
    })
}

/// Pick the matching output with the highest version code
///
/// Ties go to the output declared first. Returns `None` when no output is
/// compatible with the device.
pub fn select_best_output<'a>(
    outputs: &'a [VariantOutput],
    device_abis: &[String],
    device_density: u32,
) -> Option<&'a VariantOutput> {
    let bucket = density_bucket(device_density);

    outputs
        .iter()
        .filter(|output| output_matches(output, device_abis, &bucket))
        .fold(None, |best: Option<&VariantOutput>, candidate| match best {
            Some(current) if current.version_code >= candidate.version_code => Some(current),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str, version_code: i64, filters: &[(FilterType, &str)]) -> VariantOutput {
        VariantOutput {
            name: name.to_string(),
            output_file_path: format!("/build/outputs/apk/app-{name}-debug.apk"),
            version_code,
            filters: filters
                .iter()
                .map(|(filter_type, identifier)| OutputFilter {
                    filter_type: filter_type.clone(),
                    identifier: identifier.to_string(),
                })
                .collect(),
        }
    }

    fn abis(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn abi_split() -> Vec<VariantOutput> {
        vec![
            output("x86", 1, &[(FilterType::Abi, "x86")]),
            output("armeabi-v7a", 2, &[(FilterType::Abi, "armeabi-v7a")]),
            output("mips", 3, &[(FilterType::Abi, "mips")]),
        ]
    }

    fn density_split() -> Vec<VariantOutput> {
        vec![
            output("universal", 1, &[]),
            output("ldpi", 1, &[(FilterType::Density, "ldpi")]),
            output("mdpi", 1, &[(FilterType::Density, "mdpi")]),
        ]
    }

    #[test]
    fn test_density_bucket() {
        assert_eq!(density_bucket(0), "anydpi");
        assert_eq!(density_bucket(120), "ldpi");
        assert_eq!(density_bucket(160), "mdpi");
        assert_eq!(density_bucket(213), "tvdpi");
        assert_eq!(density_bucket(640), "xxxhdpi");
        assert_eq!(density_bucket(420), "420dpi");
    }

    #[test]
    fn test_select_by_abi() {
        let outputs = abi_split();

        let best = select_best_output(&outputs, &abis(&["x86"]), 240).unwrap();
        assert_eq!(best.name, "x86");

        let best = select_best_output(&outputs, &abis(&["armeabi-v7a"]), 240).unwrap();
        assert_eq!(best.name, "armeabi-v7a");

        let best = select_best_output(&outputs, &abis(&["mips"]), 240).unwrap();
        assert_eq!(best.name, "mips");

        assert!(select_best_output(&outputs, &abis(&["x86_64"]), 240).is_none());
    }

    #[test]
    fn test_higher_version_code_wins() {
        let outputs = abi_split();
        let best = select_best_output(&outputs, &abis(&["x86", "armeabi-v7a"]), 240).unwrap();
        assert_eq!(best.name, "armeabi-v7a");
    }

    #[test]
    fn test_equal_version_codes_prefer_earliest() {
        let mut outputs = abi_split();
        for o in &mut outputs {
            o.version_code = 7;
        }

        let best = select_best_output(&outputs, &abis(&["armeabi-v7a", "x86"]), 240).unwrap();
        assert_eq!(best.name, "x86");
    }

    #[test]
    fn test_select_by_density() {
        let outputs = density_split();
        let device = abis(&["armeabi-v7a"]);

        assert_eq!(select_best_output(&outputs, &device, 120).unwrap().name, "universal");
        assert_eq!(select_best_output(&outputs, &device, 420).unwrap().name, "universal");
    }

    #[test]
    fn test_density_split_prefers_newer_specific_output() {
        let mut outputs = density_split();
        outputs[1].version_code = 2;
        outputs[2].version_code = 2;
        let device = abis(&["armeabi-v7a"]);

        assert_eq!(select_best_output(&outputs, &device, 120).unwrap().name, "ldpi");
        assert_eq!(select_best_output(&outputs, &device, 160).unwrap().name, "mdpi");
        assert_eq!(select_best_output(&outputs, &device, 420).unwrap().name, "universal");
    }

    #[test]
    fn test_combined_filters_must_all_match() {
        let outputs = vec![output(
            "x86-hdpi",
            1,
            &[(FilterType::Abi, "x86"), (FilterType::Density, "hdpi")],
        )];

        assert!(select_best_output(&outputs, &abis(&["x86"]), 240).is_some());
        assert!(select_best_output(&outputs, &abis(&["x86"]), 320).is_none());
        assert!(select_best_output(&outputs, &abis(&["mips"]), 240).is_none());
    }

    #[test]
    fn test_unknown_filter_types_are_ignored() {
        let json = r#"{
            "name": "fr",
            "outputFilePath": "/out/app-fr.apk",
            "versionCode": 3,
            "filters": [{"filterType": "LANGUAGE", "identifier": "fr"}]
        }"#;
        let parsed: VariantOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.filters[0].filter_type, FilterType::Other);

        let outputs = vec![parsed];
        assert!(select_best_output(&outputs, &abis(&["x86"]), 160).is_some());
    }

    #[test]
    fn test_properties_from_json() {
        let json = r#"{
            "appId": "com.example.app",
            "activity": "com.example.app.MainActivity",
            "abiFilters": ["x86"],
            "assembleTask": ":app:assembleDebug",
            "variantOutputs": [{
                "name": "debug",
                "outputFilePath": "/out/app-debug.apk",
                "versionCode": 1,
                "filters": [{"filterType": "ABI", "identifier": "x86"}]
            }]
        }"#;

        let props: VariantProperties = serde_json::from_str(json).unwrap();
        assert_eq!(props.app_id, "com.example.app");
        assert_eq!(props.assemble_task, ":app:assembleDebug");
        assert_eq!(props.variant_outputs.len(), 1);
        assert_eq!(props.variant_outputs[0].filters[0].filter_type, FilterType::Abi);
    }
}
