//! Tool adapters: one thin wrapper per engine operation.
//!
//! Each adapter deserializes its arguments, calls exactly one engine
//! method, and serializes the result. No analysis logic lives here.

use std::time::Duration;

use gramspect_core::{ErrorDetail, ErrorKind};
use gramspect_lib::{Engine, EngineError, Request};
use serde::Deserialize;
use serde_json::Value;

use crate::lookup;
use crate::svg;

const DEFAULT_MAX_INPUTS: usize = 10;
const SVG_BUDGET: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrammarArgs {
    grammar_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseArgs {
    grammar_text: String,
    input: String,
    start_rule: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmbiguityArgs {
    grammar_text: String,
    start_rule: Option<String>,
    sample_inputs: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleArgs {
    grammar_text: String,
    rule: String,
    #[serde(default)]
    render_svg: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirstFollowArgs {
    grammar_text: String,
    rule: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateInputsArgs {
    grammar_text: String,
    rule: String,
    #[serde(default = "default_max_inputs")]
    max_count: usize,
}

fn default_max_inputs() -> usize {
    DEFAULT_MAX_INPUTS
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodegenArgs {
    grammar_text: String,
    target: String,
}

/// Routes one tool invocation to the engine.
pub fn dispatch(engine: &Engine, name: &str, arguments: Value) -> Result<Value, EngineError> {
    let resources = engine.config().resources.clone();
    let mut fs_lookup = lookup::grammar_lookup(&resources);
    let mut request = Request {
        lookup: Some(&mut fs_lookup),
        cancel: Default::default(),
    };

    match name {
        "validate_grammar" => {
            let args: GrammarArgs = parse_args(arguments)?;
            to_value(engine.validate(&args.grammar_text, &mut request)?)
        }
        "parse_sample" => {
            let args: ParseArgs = parse_args(arguments)?;
            to_value(engine.parse_sample(
                &args.grammar_text,
                &args.input,
                args.start_rule.as_deref(),
                &mut request,
            )?)
        }
        "detect_ambiguity" => {
            let args: AmbiguityArgs = parse_args(arguments)?;
            to_value(engine.detect_ambiguity(
                &args.grammar_text,
                args.start_rule.as_deref(),
                &args.sample_inputs,
                &mut request,
            )?)
        }
        "analyze_call_graph" => {
            let args: GrammarArgs = parse_args(arguments)?;
            to_value(engine.analyze_call_graph(&args.grammar_text, &mut request)?)
        }
        "analyze_complexity" => {
            let args: GrammarArgs = parse_args(arguments)?;
            to_value(engine.analyze_complexity(&args.grammar_text, &mut request)?)
        }
        "analyze_left_recursion" => {
            let args: GrammarArgs = parse_args(arguments)?;
            to_value(engine.analyze_left_recursion(&args.grammar_text, &mut request)?)
        }
        "analyze_first_follow" => {
            let args: FirstFollowArgs = parse_args(arguments)?;
            to_value(engine.analyze_first_follow(
                &args.grammar_text,
                args.rule.as_deref(),
                &mut request,
            )?)
        }
        "visualize_atn" => {
            let args: RuleArgs = parse_args(arguments)?;
            let mut viz = engine.visualize_atn(&args.grammar_text, &args.rule, &mut request)?;
            if args.render_svg {
                viz.svg = svg::render_svg(&viz.dot, SVG_BUDGET);
            }
            to_value(viz)
        }
        "visualize_decision" => {
            let args: RuleArgs = parse_args(arguments)?;
            to_value(engine.visualize_decision(&args.grammar_text, &args.rule, &mut request)?)
        }
        "profile_parse" => {
            let args: ParseArgs = parse_args(arguments)?;
            to_value(engine.profile(
                &args.grammar_text,
                &args.input,
                args.start_rule.as_deref(),
                &mut request,
            )?)
        }
        "generate_test_inputs" => {
            let args: GenerateInputsArgs = parse_args(arguments)?;
            to_value(engine.generate_test_inputs(
                &args.grammar_text,
                &args.rule,
                args.max_count,
                &mut request,
            )?)
        }
        "generate_code" => {
            let args: CodegenArgs = parse_args(arguments)?;
            to_value(engine.generate_code(&args.grammar_text, &args.target, &mut request)?)
        }
        "scan_embedded" => {
            let args: GrammarArgs = parse_args(arguments)?;
            to_value(engine.scan_embedded(&args.grammar_text)?)
        }
        other => Err(EngineError::single(ErrorDetail::new(
            ErrorKind::InvalidInput,
            format!("unknown tool '{other}'"),
        ))),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, EngineError> {
    serde_json::from_value(arguments).map_err(|e| {
        EngineError::single(ErrorDetail::new(
            ErrorKind::InvalidInput,
            format!("invalid tool arguments: {e}"),
        ))
    })
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| {
        EngineError::single(ErrorDetail::new(
            ErrorKind::InternalError,
            format!("result serialization failed: {e}"),
        ))
    })
}
