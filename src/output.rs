use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::json;
use serde_sarif::sarif::Result as SarifResult;
use serde_sarif::sarif::{
    ArtifactLocation, Invocation, Location, Message, MultiformatMessageString, PhysicalLocation,
    Region, ReportingDescriptor, Run, SCHEMA_URL, Sarif, Tool, ToolComponent,
};

use crate::annotation::Annotation;

/// Serialization used for the annotation output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// JSON array of check-run annotations.
    Json,
    /// SARIF 2.1.0 log.
    Sarif,
}

/// Opens the annotation sink: a created file, or stdout for `-` or no path.
pub(crate) fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = output.filter(|path| *path != Path::new("-")) else {
        return Ok(Box::new(io::stdout()));
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    Ok(Box::new(file))
}

pub(crate) fn write_annotations(
    writer: &mut dyn Write,
    format: OutputFormat,
    annotations: &[Annotation],
) -> Result<()> {
    match format {
        OutputFormat::Json => serde_json::to_writer_pretty(&mut *writer, annotations)
            .context("failed to serialize annotations")?,
        OutputFormat::Sarif => serde_json::to_writer(&mut *writer, &build_sarif(annotations))
            .context("failed to serialize SARIF output")?,
    }
    writer
        .write_all(b"\n")
        .context("failed to write annotation output")?;
    writer.flush().context("failed to flush annotation output")?;
    Ok(())
}

/// One rule per bug pattern seen, one result per annotation. SARIF's default
/// result level is already `warning`, so no level is written.
pub(crate) fn build_sarif(annotations: &[Annotation]) -> Sarif {
    let mut details_by_rule: BTreeMap<&str, &str> = BTreeMap::new();
    for annotation in annotations {
        details_by_rule
            .entry(annotation.title.as_str())
            .or_insert(annotation.raw_details.as_str());
    }
    let rules: Vec<ReportingDescriptor> = details_by_rule
        .into_iter()
        .map(|(id, details)| {
            ReportingDescriptor::builder()
                .id(id.to_string())
                .full_description(
                    MultiformatMessageString::builder()
                        .text(details.to_string())
                        .build(),
                )
                .build()
        })
        .collect();
    let results: Vec<SarifResult> = annotations.iter().map(sarif_result).collect();

    let semantic_version = env!("CARGO_PKG_VERSION").to_string();
    let driver = if rules.is_empty() {
        ToolComponent::builder()
            .name("spotbugs-annotate")
            .semantic_version(semantic_version)
            .build()
    } else {
        ToolComponent::builder()
            .name("spotbugs-annotate")
            .rules(rules)
            .semantic_version(semantic_version)
            .build()
    };
    let tool = Tool {
        driver,
        extensions: None,
        properties: None,
    };
    let run = Run::builder()
        .tool(tool)
        .invocations(vec![build_invocation()])
        .results(results)
        .build();

    Sarif::builder()
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .version(json!("2.1.0"))
        .build()
}

fn sarif_result(annotation: &Annotation) -> SarifResult {
    let message = Message::builder().text(annotation.message.clone()).build();
    if annotation.path.is_empty() {
        return SarifResult::builder()
            .rule_id(annotation.title.clone())
            .message(message)
            .build();
    }
    let location = Location::builder()
        .physical_location(
            PhysicalLocation::builder()
                .artifact_location(
                    ArtifactLocation::builder()
                        .uri(annotation.path.clone())
                        .build(),
                )
                .region(
                    Region::builder()
                        .start_line(i64::from(annotation.start_line))
                        .end_line(i64::from(annotation.end_line))
                        .build(),
                )
                .build(),
        )
        .build();
    SarifResult::builder()
        .rule_id(annotation.title.clone())
        .message(message)
        .locations(vec![location])
        .build()
}

fn build_invocation() -> Invocation {
    let arguments: Vec<String> = std::env::args().collect();
    let command_line = arguments.join(" ");
    Invocation::builder()
        .execution_successful(true)
        .arguments(arguments)
        .command_line(command_line)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationLevel;

    fn annotation(title: &str, path: &str, start_line: u32, end_line: u32) -> Annotation {
        Annotation {
            annotation_level: AnnotationLevel::Warning,
            path: path.to_string(),
            start_line,
            end_line,
            title: title.to_string(),
            message: format!("{title} message"),
            raw_details: format!("{title} details"),
        }
    }

    #[test]
    fn json_output_is_an_annotation_array() {
        let annotations = vec![annotation("SE_BAD_FIELD", "src/Order.java", 15, 15)];
        let mut buffer: Vec<u8> = Vec::new();

        write_annotations(&mut buffer, OutputFormat::Json, &annotations).expect("write json");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("parse json");

        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["annotation_level"], "warning");
        assert_eq!(value[0]["path"], "src/Order.java");
        assert!(buffer.ends_with(b"\n"));
    }

    #[test]
    fn json_output_of_no_annotations_is_empty_array() {
        let mut buffer: Vec<u8> = Vec::new();

        write_annotations(&mut buffer, OutputFormat::Json, &[]).expect("write json");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("parse json");

        assert_eq!(value, json!([]));
    }

    #[test]
    fn sarif_has_one_rule_per_pattern_and_one_result_per_annotation() {
        let annotations = vec![
            annotation("SE_BAD_FIELD", "src/Order.java", 15, 15),
            annotation("OS_OPEN_STREAM", "src/FileStore.java", 45, 47),
            annotation("SE_BAD_FIELD", "src/Customer.java", 9, 9),
        ];

        let value = serde_json::to_value(build_sarif(&annotations)).expect("serialize SARIF");

        assert_eq!(value["version"], "2.1.0");
        assert_eq!(value["$schema"], SCHEMA_URL);
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["name"], "spotbugs-annotate");
        assert_eq!(
            run["tool"]["driver"]["semanticVersion"],
            env!("CARGO_PKG_VERSION")
        );
        let rules = run["tool"]["driver"]["rules"].as_array().expect("rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["id"], "OS_OPEN_STREAM");
        assert_eq!(rules[0]["fullDescription"]["text"], "OS_OPEN_STREAM details");
        let results = run["results"].as_array().expect("results");
        assert_eq!(results.len(), 3);
        assert_eq!(results[1]["ruleId"], "OS_OPEN_STREAM");
        let physical = &results[1]["locations"][0]["physicalLocation"];
        assert_eq!(physical["artifactLocation"]["uri"], "src/FileStore.java");
        assert_eq!(physical["region"]["startLine"], 45);
        assert_eq!(physical["region"]["endLine"], 47);
        assert_eq!(run["invocations"][0]["executionSuccessful"], true);
    }

    #[test]
    fn sarif_result_without_path_has_no_location() {
        let annotations = vec![annotation("SE_BAD_FIELD", "", 15, 15)];

        let value = serde_json::to_value(build_sarif(&annotations)).expect("serialize SARIF");

        assert!(value["runs"][0]["results"][0]["locations"].is_null());
        assert_eq!(value["runs"][0]["results"][0]["message"]["text"], "SE_BAD_FIELD message");
    }

    #[test]
    fn sarif_without_annotations_omits_rules() {
        let value = serde_json::to_value(build_sarif(&[])).expect("serialize SARIF");

        assert!(value["runs"][0]["tool"]["driver"]["rules"].is_null());
        assert!(
            value["runs"][0]["results"]
                .as_array()
                .expect("results array")
                .is_empty()
        );
    }

    #[test]
    fn output_writer_creates_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("annotations.json");

        {
            let mut writer = output_writer(Some(path.as_path())).expect("open writer");
            write_annotations(writer.as_mut(), OutputFormat::Json, &[]).expect("write json");
        }

        let content = std::fs::read_to_string(&path).expect("read output");
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn output_writer_names_the_path_it_cannot_create() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("annotations.json");

        let err = output_writer(Some(path.as_path())).err().expect("open should fail");

        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }
}
