use chrono::Local;
use serde_json::Value;

use relay::errors::AgentResult;
use relay::models::tool::{ParameterKind, Tool, ToolParameter};
use relay::registry::{ToolRegistry, ToolSpec};

/// Tools for the clinical specialist: a patient-history lookup over the
/// built-in demo records.
pub fn specialist_registry() -> AgentResult<ToolRegistry> {
    let tool = Tool::new(
        "patient_history",
        "Looks up the clinical history of a known patient.",
    )
    .with_parameter(ToolParameter::new(
        "patient_name",
        ParameterKind::String,
        true,
        "Full name of the patient",
    ));

    let mut registry = ToolRegistry::new();
    registry.register(ToolSpec::new(tool, |arguments| async move {
        let name = arguments["patient_name"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(patient_history(&name))
    }))?;
    Ok(registry)
}

fn patient_history(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "juan perez" => "Juan Perez, 45. Hypertension diagnosed 2019, on enalapril 10mg. \
                         Type 2 diabetes, metformin 850mg. Last visit: routine checkup, \
                         HbA1c 6.8%, blood pressure 135/85."
            .to_string(),
        "maria garcia" => "Maria Garcia, 32. Asthma since childhood, salbutamol as needed. \
                           Penicillin allergy. Last visit: mild exacerbation after flu, \
                           resolved with inhaled corticosteroids."
            .to_string(),
        _ => format!("No history found for patient '{name}'."),
    }
}

/// Tools for the secretary: the report exporter. The written file is an
/// opaque side effect; only the returned status line goes back to the model.
pub fn secretary_registry() -> AgentResult<ToolRegistry> {
    let tool = Tool::new(
        "save_report",
        "Saves the medical report into a professional Markdown file.",
    )
    .with_parameter(ToolParameter::new(
        "report_content",
        ParameterKind::String,
        true,
        "The full text content of the medical report",
    ))
    .with_parameter(ToolParameter::new(
        "patient_name",
        ParameterKind::String,
        false,
        "The name of the patient for the filename",
    ));

    let mut registry = ToolRegistry::new();
    registry.register(ToolSpec::new(tool, |arguments| async move {
        save_report(&arguments)
    }))?;
    Ok(registry)
}

fn save_report(arguments: &Value) -> Result<String, String> {
    let content = arguments["report_content"].as_str().unwrap_or_default();
    let patient = arguments["patient_name"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Unknown_Patient");

    let file_name = format!(
        "Report_{}_{}.md",
        patient.trim().replace(' ', "_"),
        Local::now().format("%Y%m%d")
    );

    let body = format!(
        "# WEEKLY MEDICAL REPORT\n\n*Date: {}*\n\n{}\n",
        Local::now().format("%A, %B %d, %Y"),
        content
    );

    std::fs::write(&file_name, body).map_err(|e| format!("Error creating report: {e}"))?;
    Ok(format!("Success: report saved as {file_name}"))
}
