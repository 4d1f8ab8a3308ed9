//! Apply command: fill in a form and submit it

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use portal_core::values;
use portal_core::{ApplyOutcome, FieldKind, FieldNode, FormError, FormSchema, FormService, FormSession, ValidationReport};
use serde_json::Value;

use super::{load_forms, select_form, Context};
use crate::output::{self, OutputFormat};
use crate::ApplyArgs;

pub async fn handle(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let forms = load_forms(&ctx.service).await?;
    let mut session = FormSession::new(select_form(forms, args.form.as_deref())?);

    let mut inputs = Vec::new();
    if let Some(path) = &args.values {
        inputs.extend(read_values_file(session.schema(), path)?);
    }
    for assignment in &args.set {
        inputs.push(parse_assignment(session.schema(), assignment)?);
    }
    fill(&mut session, &ctx.service, inputs).await?;

    let theme = ColorfulTheme::default();
    if args.interactive {
        prompt_fields(&mut session, &ctx.service, &theme, None).await?;
    }

    if args.dry_run {
        return match session.validate() {
            Ok(payload) => ctx.format.print(&payload),
            Err(report) => {
                print_report(&report, ctx.format)?;
                Err(FormError::Validation(report).into())
            }
        };
    }

    loop {
        match session.submit(&ctx.service).await {
            Ok(receipt) => {
                if ctx.format == OutputFormat::Table {
                    output::success("Application submitted");
                }
                ctx.format.print(&receipt)?;
                return Ok(());
            }
            Err(FormError::Validation(report)) => {
                print_report(&report, ctx.format)?;
                if !args.interactive {
                    return Err(FormError::Validation(report).into());
                }
                let failed: HashSet<String> = report.field_ids().into_iter().map(str::to_string).collect();
                prompt_fields(&mut session, &ctx.service, &theme, Some(&failed)).await?;
            }
            Err(FormError::Submit(e)) => {
                output::notice(&format!("Submission failed: {}", e));
                let retry = args.interactive
                    && Confirm::with_theme(&theme)
                        .with_prompt("Retry submission?")
                        .default(true)
                        .interact()?;
                if !retry {
                    return Err(FormError::Submit(e).into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Parse `FIELD_ID=VALUE` against the field's kind
pub fn parse_assignment(schema: &FormSchema, assignment: &str) -> Result<(String, Value)> {
    let Some((id, raw)) = assignment.split_once('=') else {
        bail!("expected FIELD_ID=VALUE, got {:?}", assignment);
    };
    let id = id.trim();
    let field = leaf(schema, id)?;
    Ok((id.to_string(), values::parse_input(field, raw)?))
}

/// Read a YAML or JSON mapping of field ids to values.
///
/// Strings are parsed like `--set` input so `age: "25"` still lands as a
/// number; other scalars and lists are taken as written.
pub fn read_values_file(schema: &FormSchema, path: &Path) -> Result<Vec<(String, Value)>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: BTreeMap<String, Value> =
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    raw.into_iter()
        .map(|(id, value)| {
            let field = leaf(schema, &id)?;
            let value = match value {
                Value::String(s) => values::parse_input(field, &s)?,
                other => other,
            };
            Ok((id, value))
        })
        .collect()
}

fn leaf<'a>(schema: &'a FormSchema, id: &str) -> Result<&'a FieldNode> {
    match schema.find(id) {
        Some(node) if !node.is_group() => Ok(node),
        _ => Err(FormError::UnknownField(id.to_string()).into()),
    }
}

/// Apply captured values, option sources before the fields that follow them.
///
/// Setting a dependency resets its dependents, so a state given before its
/// country would otherwise be lost.
pub async fn fill(session: &mut FormSession, service: &dyn FormService, mut inputs: Vec<(String, Value)>) -> Result<()> {
    let schema = session.schema();
    let order: Vec<&str> = schema.leaves().iter().map(|n| n.id.as_str()).collect();
    let rank = |id: &str| {
        (
            options_depth(schema, id),
            order.iter().position(|o| *o == id).unwrap_or(usize::MAX),
        )
    };
    let mut ranked: Vec<_> = inputs.drain(..).map(|(id, value)| (rank(&id), id, value)).collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, id, value) in ranked {
        let outcomes = session.change(service, &id, value).await?;
        report_outcomes(&outcomes);
    }
    Ok(())
}

/// Length of the chain of option sources above `id`
fn options_depth<'a>(schema: &'a FormSchema, id: &'a str) -> usize {
    let mut seen = HashSet::new();
    let mut current = id;
    while let Some(options) = schema.find(current).and_then(FieldNode::dynamic_options) {
        if !seen.insert(current) {
            break;
        }
        current = options.depends_on.as_str();
    }
    seen.len()
}

fn report_outcomes(outcomes: &[ApplyOutcome]) {
    for outcome in outcomes {
        match outcome {
            ApplyOutcome::Applied { field_id, count } => {
                tracing::debug!(field = %field_id, count, "options loaded")
            }
            ApplyOutcome::Stale { .. } => {}
            ApplyOutcome::Failed { field_id, reason } => {
                output::notice(&format!("Could not load options for {}: {}", field_id, reason))
            }
        }
    }
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            output::failure("Please fix the following fields:");
            let rows = report.iter().map(|r| {
                let reasons: Vec<String> = r.violations.iter().map(ToString::to_string).collect();
                vec![r.field_id.clone(), r.label.clone(), reasons.join("; ")]
            });
            eprintln!("{}", output::table(["Field", "Label", "Problem"], rows));
            Ok(())
        }
        format => {
            let fields: BTreeMap<&str, Vec<String>> = report
                .iter()
                .map(|r| (r.field_id.as_str(), r.violations.iter().map(ToString::to_string).collect()))
                .collect();
            format.print(&fields)
        }
    }
}

/// Prompt for visible fields in order, re-reading visibility after each
/// answer. With `only`, just those fields are asked.
async fn prompt_fields(
    session: &mut FormSession,
    service: &dyn FormService,
    theme: &ColorfulTheme,
    only: Option<&HashSet<String>>,
) -> Result<()> {
    let mut asked = HashSet::new();
    loop {
        let next = session
            .visible_leaves()
            .into_iter()
            .find(|f| !asked.contains(&f.id) && only.map_or(true, |ids| ids.contains(&f.id)))
            .cloned();
        let Some(field) = next else {
            return Ok(());
        };
        asked.insert(field.id.clone());

        let value = prompt_field(&field, session, theme)?;
        let outcomes = session.change(service, &field.id, value).await?;
        report_outcomes(&outcomes);
    }
}

fn prompt_field(field: &FieldNode, session: &FormSession, theme: &ColorfulTheme) -> Result<Value> {
    let label = if field.required { format!("{} *", field.label) } else { field.label.clone() };
    let current = session.values().filled(&field.id).cloned();

    // dialoguer refuses an empty item list; keep whatever was captured
    let options = session.options_for(&field.id);
    if field.choices().is_some() && options.is_empty() {
        output::notice(&format!("{}: no options available", field.label));
        return Ok(current.unwrap_or(Value::Null));
    }

    match &field.kind {
        FieldKind::Select(_) | FieldKind::Radio(_) => {
            let (items, default) = choice_items(&options, field.required, current.as_ref());
            let index = Select::with_theme(theme)
                .with_prompt(label)
                .items(&items)
                .default(default)
                .interact()?;
            Ok(chosen(&options, field.required, index))
        }
        FieldKind::Checkbox(_) => {
            let checked: Vec<bool> = options
                .iter()
                .map(|o| match &current {
                    Some(Value::Array(items)) => items.iter().any(|i| i.as_str() == Some(o.as_str())),
                    _ => false,
                })
                .collect();
            let picked = MultiSelect::with_theme(theme)
                .with_prompt(label)
                .items(&options)
                .defaults(&checked)
                .interact()?;
            Ok(Value::Array(picked.into_iter().map(|i| Value::String(options[i].clone())).collect()))
        }
        _ => loop {
            let mut input = Input::<String>::with_theme(theme).with_prompt(label.as_str()).allow_empty(true);
            if let Some(value) = &current {
                input = input.with_initial_text(values::display(value));
            }
            let raw = input.interact_text()?;
            match values::parse_input(field, &raw) {
                Ok(value) => return Ok(value),
                Err(e) => output::notice(&e.to_string()),
            }
        },
    }
}

const NO_CHOICE: &str = "(none)";

/// Items for a single-choice prompt and the index to preselect.
/// Optional fields lead with a blank entry.
fn choice_items(options: &[String], required: bool, current: Option<&Value>) -> (Vec<String>, usize) {
    let mut items = Vec::with_capacity(options.len() + 1);
    if !required {
        items.push(NO_CHOICE.to_string());
    }
    let offset = items.len();
    items.extend(options.iter().cloned());
    let default = current
        .and_then(Value::as_str)
        .and_then(|c| options.iter().position(|o| o == c))
        .map_or(0, |i| i + offset);
    (items, default)
}

/// Value for the item picked from [`choice_items`]
fn chosen(options: &[String], required: bool, index: usize) -> Value {
    index
        .checked_sub(usize::from(!required))
        .and_then(|i| options.get(i))
        .map_or(Value::Null, |o| Value::String(o.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::{InMemoryFormService, OptionGroups};
    use serde_json::json;

    fn home_form() -> FormSchema {
        serde_json::from_value(json!({
            "formId": "home", "title": "Home Insurance",
            "fields": [
                { "id": "state", "label": "State", "type": "select", "required": true,
                  "dynamicOptions": { "dependsOn": "country", "endpoint": "api/getStates", "method": "GET" } },
                { "id": "country", "label": "Country", "type": "select", "options": ["USA", "Canada"] },
                { "id": "rooms", "label": "Rooms", "type": "number" },
                { "id": "extras", "label": "Extras", "type": "checkbox", "options": ["Pool", "Garage"] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        let schema = home_form();
        assert_eq!(parse_assignment(&schema, "rooms=3").unwrap(), ("rooms".to_string(), json!(3)));
        assert_eq!(
            parse_assignment(&schema, "extras=Pool, Garage").unwrap().1,
            json!(["Pool", "Garage"])
        );
        assert!(parse_assignment(&schema, "rooms").is_err());
        assert!(parse_assignment(&schema, "rooms=many").is_err());
        assert!(parse_assignment(&schema, "garden=yes").is_err());
    }

    #[test]
    fn test_read_values_file() {
        let path = std::env::temp_dir().join(format!("portal-values-{}.yaml", std::process::id()));
        fs::write(&path, "country: USA\nrooms: \"4\"\nextras: [Pool]\n").unwrap();
        let mut read = read_values_file(&home_form(), &path).unwrap();
        fs::remove_file(&path).unwrap();
        read.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            read,
            vec![
                ("country".to_string(), json!("USA")),
                ("extras".to_string(), json!(["Pool"])),
                ("rooms".to_string(), json!(4)),
            ]
        );
    }

    #[test]
    fn test_options_depth() {
        let schema = home_form();
        assert_eq!(options_depth(&schema, "country"), 0);
        assert_eq!(options_depth(&schema, "state"), 1);
    }

    #[tokio::test]
    async fn test_fill_sets_dependency_first() {
        let groups: OptionGroups = [("states".to_string(), vec!["California".to_string()])].into();
        let service = InMemoryFormService::new().with_options("api/getStates", "USA", groups);
        let mut session = FormSession::new(home_form());

        let inputs = vec![
            ("state".to_string(), json!("California")),
            ("country".to_string(), json!("USA")),
        ];
        fill(&mut session, &service, inputs).await.unwrap();

        assert_eq!(session.values().get("state"), Some(&json!("California")));
        assert_eq!(session.options_for("state"), vec!["California"]);
        assert_eq!(session.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_optional_choice_offers_blank() {
        let options = vec!["Alarm".to_string(), "Camera".to_string()];

        let (items, default) = choice_items(&options, false, None);
        assert_eq!(items, vec!["(none)", "Alarm", "Camera"]);
        assert_eq!(default, 0);
        assert_eq!(chosen(&options, false, 0), Value::Null);
        assert_eq!(chosen(&options, false, 2), json!("Camera"));

        let (items, default) = choice_items(&options, true, Some(&json!("Camera")));
        assert_eq!(items, vec!["Alarm", "Camera"]);
        assert_eq!(default, 1);
        assert_eq!(chosen(&options, true, 0), json!("Alarm"));
    }

    #[test]
    fn test_choice_without_options_skips_prompt() {
        let schema: FormSchema = serde_json::from_value(json!({
            "formId": "home", "title": "Home",
            "fields": [
                { "id": "country", "label": "Country", "type": "select", "options": ["USA"] },
                { "id": "perils", "label": "Perils", "type": "checkbox",
                  "dynamicOptions": { "dependsOn": "country", "endpoint": "api/getPerils", "method": "GET" } },
                { "id": "state", "label": "State", "type": "select",
                  "dynamicOptions": { "dependsOn": "country", "endpoint": "api/getStates", "method": "GET" } }
            ]
        }))
        .unwrap();
        let session = FormSession::new(schema);
        let theme = ColorfulTheme::default();
        for id in ["perils", "state"] {
            let field = session.schema().find(id).unwrap();
            assert_eq!(prompt_field(field, &session, &theme).unwrap(), Value::Null);
        }
    }
}
