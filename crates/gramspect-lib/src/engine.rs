//! Engine façade: the public API consumed by tool adapters.
//!
//! An [`Engine`] owns the configuration and the cache; every operation is
//! a pure function of its inputs plus the cache. Requests carry their own
//! cancellation token and optional grammar lookup, so the engine itself
//! has no cross-task state beyond cache access.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gramspect_atn::{Atn, build};
use gramspect_core::reports::{
    AmbiguityEventInfo, AmbiguityReport, AtnVisualization, CallGraphReport, CodegenReport,
    ComplexityReport, DecisionCoverage, DecisionProfileInfo, DecisionViz, DecisionVisualization,
    FirstFollowReport, GeneratedTestInputs, LeftRecursionReport, ParseReport, ProfileReport,
    RuleCounts, RuleKind, RuleSets, SampleAmbiguities, TimingInfo, TokenInfo, TreeNode,
    ValidationResult,
};
use gramspect_core::{
    CancelToken, EngineConfig, ErrorDetail, ErrorKind, Severity, SourceLocation,
};
use gramspect_syntax::diagnostics::DiagnosticMessage;
use gramspect_syntax::embedded::{self, EmbeddedCodeReport};
use gramspect_syntax::model::GrammarSource;
use gramspect_syntax::{ImportError, LineIndex, imports, parse_grammar};
use gramspect_vm::{
    Budget, NoopSink, ParseTree, ProfileRecorder, RuntimeError, Token, default_channel, lex,
};
use indexmap::IndexMap;

use crate::analysis::{
    CallGraph, DecisionSets, FirstFollow, call_graph, complexity, decision_lookahead,
    first_follow, left_recursion_report,
};
use crate::cache::{Cache, content_key};
use crate::codegen;
use crate::gen_inputs::generate_inputs;
use crate::render::{self, Digraph, NodeShape, render_lisp};

/// Structured failure of an engine operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .errors.first().map(|e| e.message.as_str()).unwrap_or("engine error"))]
pub struct EngineError {
    pub errors: Vec<ErrorDetail>,
}

impl EngineError {
    pub fn single(detail: ErrorDetail) -> Self {
        Self {
            errors: vec![detail],
        }
    }

    fn of(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::single(ErrorDetail::new(kind, message))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Per-request inputs that are not part of the content key: the grammar
/// lookup used by the import resolver and the cancellation token.
pub struct Request<'a> {
    pub lookup: Option<&'a mut dyn FnMut(&str) -> Option<String>>,
    pub cancel: CancelToken,
}

impl Default for Request<'_> {
    fn default() -> Self {
        Self {
            lookup: None,
            cancel: CancelToken::new(),
        }
    }
}

/// An immutable compiled grammar: source, model, ATN, line index.
/// Cached and shared; never mutated after construction.
pub struct CompiledGrammar {
    pub source: String,
    pub grammar: GrammarSource,
    pub atn: Atn,
    pub line_index: LineIndex,
    /// Warning-severity findings gathered during compilation.
    pub warnings: Vec<ErrorDetail>,
}

/// The analysis engine. Cheap to share behind an `Arc`; all operations
/// take `&self`.
pub struct Engine {
    config: EngineConfig,
    cache: Cache,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let cache = Cache::new(config.cache.clone());
        Self { config, cache }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =====================================================================
    // Compilation
    // =====================================================================

    /// Parses, resolves imports, and builds the ATN. Errors carry the
    /// full enriched list.
    fn compile(&self, source: &str, request: &mut Request<'_>) -> EngineResult<Arc<CompiledGrammar>> {
        self.check_grammar_size(source)?;

        let key = content_key(&[source]);
        if let Some(compiled) = self.cache.get_compiled(&key) {
            return Ok(compiled);
        }

        let deadline = Instant::now() + Duration::from_secs(self.config.compilation_timeout_seconds);
        let line_index = LineIndex::new(source);

        if source.trim().is_empty() {
            return Err(EngineError::of(
                ErrorKind::GrammarLoadError,
                "grammar text is empty",
            ));
        }

        let (grammar, diagnostics) = parse_grammar(source);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        split_diagnostics(&diagnostics, &line_index, &mut errors, &mut warnings);
        if !errors.is_empty() {
            return Err(EngineError { errors });
        }

        let mut fallback = |_: &str| None;
        let lookup: &mut dyn FnMut(&str) -> Option<String> = match &mut request.lookup {
            Some(lookup) => &mut **lookup,
            None => &mut fallback,
        };
        let resolved = imports::resolve(grammar, lookup, self.config.max_import_depth)
            .map_err(|e| import_error(&e))?;
        split_diagnostics(
            &resolved.diagnostics,
            &line_index,
            &mut errors,
            &mut warnings,
        );
        if !errors.is_empty() {
            return Err(EngineError { errors });
        }
        self.check_deadline(deadline)?;

        let (atn, build_diags) = build(&resolved.grammar);
        split_diagnostics(&build_diags, &line_index, &mut errors, &mut warnings);
        if !errors.is_empty() {
            return Err(EngineError { errors });
        }
        if let Err(violation) = atn.check_invariants() {
            return Err(EngineError::of(ErrorKind::InternalError, violation));
        }
        self.check_deadline(deadline)?;

        if resolved.grammar.has_embedded_code() {
            warnings.push(ErrorDetail::warning(
                ErrorKind::SemanticError,
                "grammar contains embedded actions or predicates; the interpreter \
                 detects but does not execute them",
            ));
        }

        let compiled = Arc::new(CompiledGrammar {
            source: source.to_owned(),
            grammar: resolved.grammar,
            atn,
            line_index,
            warnings,
        });
        self.cache.put_compiled(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    fn check_grammar_size(&self, source: &str) -> EngineResult<()> {
        if source.len() > self.config.max_grammar_size_bytes() {
            return Err(EngineError::of(
                ErrorKind::InvalidInput,
                format!(
                    "grammar exceeds the {} MB size limit",
                    self.config.max_grammar_size_mb
                ),
            ));
        }
        Ok(())
    }

    fn check_input_size(&self, input: &str) -> EngineResult<()> {
        if input.len() > self.config.max_input_size_bytes() {
            return Err(EngineError::of(
                ErrorKind::InvalidInput,
                format!(
                    "sample input exceeds the {} MB size limit",
                    self.config.max_input_size_mb
                ),
            ));
        }
        Ok(())
    }

    fn check_deadline(&self, deadline: Instant) -> EngineResult<()> {
        if Instant::now() > deadline {
            return Err(EngineError::of(
                ErrorKind::GrammarLoadError,
                format!(
                    "grammar compilation exceeded {} seconds",
                    self.config.compilation_timeout_seconds
                ),
            ));
        }
        Ok(())
    }

    fn parse_budget(&self, cancel: &CancelToken) -> Budget {
        Budget::new(
            Some(Duration::from_secs(self.config.parse_timeout_seconds)),
            cancel.clone(),
        )
    }

    // =====================================================================
    // Operations
    // =====================================================================

    /// Grammar validation: never fails on grammar problems, they land in
    /// the result's error list.
    pub fn validate(&self, source: &str, request: &mut Request<'_>) -> EngineResult<ValidationResult> {
        self.check_grammar_size(source)?;

        if source.trim().is_empty() {
            return Err(EngineError::of(
                ErrorKind::GrammarLoadError,
                "grammar text is empty",
            ));
        }

        match self.compile(source, request) {
            Ok(compiled) => {
                let grammar = &compiled.grammar;
                let mut warnings = compiled.warnings.clone();
                // Unused-rule findings ride along as warnings.
                let graph = call_graph(grammar, None);
                for node in &graph.nodes {
                    if node.unused && node.rule != graph.start_rule {
                        warnings.push(ErrorDetail::warning(
                            ErrorKind::SemanticError,
                            format!("rule '{}' is never used from the start rule", node.rule),
                        ));
                    }
                }
                Ok(ValidationResult {
                    grammar_name: grammar.name.clone(),
                    kind: grammar.kind,
                    valid: true,
                    rule_counts: rule_counts(grammar),
                    declared_tokens: grammar.declared_tokens.clone(),
                    channels: grammar.declared_channels.clone(),
                    options: grammar.options.clone(),
                    errors: Vec::new(),
                    warnings,
                })
            }
            Err(failure) => {
                // Structural information is still reported when the model
                // layer produced something.
                let (grammar, _) = parse_grammar(source);
                let (errors, warnings): (Vec<_>, Vec<_>) =
                    failure.errors.into_iter().partition(ErrorDetail::is_error);
                Ok(ValidationResult {
                    grammar_name: grammar.name.clone(),
                    kind: grammar.kind,
                    valid: false,
                    rule_counts: rule_counts(&grammar),
                    declared_tokens: grammar.declared_tokens.clone(),
                    channels: grammar.declared_channels.clone(),
                    options: grammar.options.clone(),
                    errors,
                    warnings,
                })
            }
        }
    }

    /// Parses one sample input and returns tree, tokens, and timings.
    pub fn parse_sample(
        &self,
        source: &str,
        input: &str,
        start_rule: Option<&str>,
        request: &mut Request<'_>,
    ) -> EngineResult<ParseReport> {
        self.check_input_size(input)?;
        let compiled = self.compile(source, request)?;

        let key = content_key(&[source, start_rule.unwrap_or(""), input]);
        if let Some(report) = self.cache.get_parse(&key) {
            return Ok(report);
        }

        let (report, _) =
            self.run_parse(&compiled, input, start_rule, &request.cancel, &mut NoopSink)?;
        self.cache.put_parse(key, report.clone());
        Ok(report)
    }

    /// Runs lexer and parser over one sample, with the per-sample budget.
    /// Also returns the DFA states built per decision.
    fn run_parse<S: gramspect_vm::ProfileSink>(
        &self,
        compiled: &CompiledGrammar,
        input: &str,
        start_rule: Option<&str>,
        cancel: &CancelToken,
        sink: &mut S,
    ) -> EngineResult<(ParseReport, Vec<(u32, usize)>)> {
        let grammar = &compiled.grammar;
        let atn = &compiled.atn;
        let budget = self.parse_budget(cancel);
        let begun = Instant::now();

        let start_name = match start_rule
            .map(str::to_owned)
            .or_else(|| grammar.parser_rules().next().map(|r| r.name.clone()))
        {
            Some(name) => name,
            None => {
                return Ok((
                    failed_report(
                        start_rule.unwrap_or("<none>"),
                        ErrorDetail::new(
                            ErrorKind::ParseError,
                            "grammar has no parser rule to start from",
                        ),
                    ),
                    Vec::new(),
                ));
            }
        };
        let Some(start) = atn.rule_by_name(&start_name).filter(|r| !r.is_lexer) else {
            return Ok((
                failed_report(
                    &start_name,
                    ErrorDetail::new(
                        ErrorKind::ParseError,
                        format!("start rule '{start_name}' is not a parser rule of this grammar"),
                    ),
                ),
                Vec::new(),
            ));
        };
        let start_id = start.id;

        let lexed = match lex(atn, input, &budget) {
            Ok(lexed) => lexed,
            Err(error) => return self.runtime_failure(&start_name, error),
        };
        let lex_ms = begun.elapsed().as_secs_f64() * 1e3;

        let warnings = compiled.warnings.clone();
        let mut errors: Vec<ErrorDetail> = lexed
            .errors
            .iter()
            .map(|e| {
                ErrorDetail::new(ErrorKind::ParseError, e.message.clone())
                    .at(SourceLocation::new(e.line, e.column))
            })
            .collect();

        let tokens = default_channel(&lexed.tokens);
        let parse_begun = Instant::now();
        let outcome = match gramspect_vm::parse(
            atn,
            &grammar.vocabulary,
            &tokens,
            start_id,
            budget,
            sink,
        ) {
            Ok(outcome) => outcome,
            Err(error) => return self.runtime_failure(&start_name, error),
        };
        let parse_ms = parse_begun.elapsed().as_secs_f64() * 1e3;

        errors.extend(outcome.errors.iter().map(|e| {
            ErrorDetail::new(ErrorKind::ParseError, e.message.clone())
                .at(SourceLocation::new(e.line, e.column))
        }));
        let success = errors.iter().all(|e| e.severity != Severity::Error);

        let tree = tree_to_report(&outcome.tree, &tokens, grammar);
        let lisp = render_lisp(&outcome.tree, false);
        let token_infos = lexed
            .tokens
            .iter()
            .map(|t| token_info(t, grammar))
            .collect();

        let report = ParseReport {
            success,
            start_rule: start_name,
            tree: Some(tree),
            lisp: Some(lisp),
            tokens: token_infos,
            errors,
            warnings,
            timing: TimingInfo {
                lex_ms,
                parse_ms,
                total_ms: begun.elapsed().as_secs_f64() * 1e3,
            },
        };
        Ok((report, outcome.dfa_sizes))
    }

    fn runtime_failure(
        &self,
        start_rule: &str,
        error: RuntimeError,
    ) -> EngineResult<(ParseReport, Vec<(u32, usize)>)> {
        match error {
            RuntimeError::Cancelled => Err(EngineError::of(
                ErrorKind::Cancelled,
                "request cancelled",
            )),
            RuntimeError::ParseTimeout(budget) => Ok((
                failed_report(
                    start_rule,
                    ErrorDetail::new(
                        ErrorKind::ParseTimeout,
                        format!("sample parse exceeded its {budget:?} budget"),
                    ),
                ),
                Vec::new(),
            )),
            RuntimeError::Internal(message) => Ok((
                failed_report(
                    start_rule,
                    ErrorDetail::new(ErrorKind::ParseError, message),
                ),
                Vec::new(),
            )),
        }
    }

    /// Runs every sample through a profiling parse and aggregates the
    /// ambiguity events. Per-sample failures do not abort the request.
    pub fn detect_ambiguity(
        &self,
        source: &str,
        start_rule: Option<&str>,
        samples: &[String],
        request: &mut Request<'_>,
    ) -> EngineResult<AmbiguityReport> {
        let compiled = self.compile(source, request)?;
        let atn = &compiled.atn;

        let mut sample_reports = Vec::with_capacity(samples.len());
        let mut rule_counts: IndexMap<String, usize> = IndexMap::new();
        let mut exercised: Vec<u32> = Vec::new();
        let mut has_ambiguities = false;

        for (sample_index, input) in samples.iter().enumerate() {
            if request.cancel.is_cancelled() {
                return Err(EngineError::of(ErrorKind::Cancelled, "request cancelled"));
            }
            self.check_input_size(input)?;

            let mut recorder = ProfileRecorder::new();
            let (report, _) =
                self.run_parse(&compiled, input, start_rule, &request.cancel, &mut recorder)?;

            for stats in recorder.decisions() {
                if !exercised.contains(&stats.decision) {
                    exercised.push(stats.decision);
                }
            }

            let mut events = Vec::new();
            for event in recorder.ambiguities() {
                has_ambiguities = true;
                let rule_name = atn.rule(event.rule).name.clone();
                *rule_counts.entry(rule_name.clone()).or_insert(0) += 1;
                events.push(ambiguity_info(event, &rule_name, input, atn));
            }

            let error = report
                .errors
                .iter()
                .find(|e| e.kind == ErrorKind::ParseTimeout)
                .cloned();
            sample_reports.push(SampleAmbiguities {
                sample_index,
                input: input.clone(),
                events,
                error,
            });
        }

        Ok(AmbiguityReport {
            has_ambiguities,
            samples: sample_reports,
            rule_counts,
            coverage: DecisionCoverage {
                decisions_total: atn.decisions.len(),
                decisions_exercised: exercised.len(),
            },
        })
    }

    pub fn analyze_call_graph(
        &self,
        source: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<CallGraphReport> {
        let key = content_key(&[source, "callgraph"]);
        if let Some(report) = self.cache.get_analysis(&key) {
            return Ok(report);
        }
        let compiled = self.compile(source, request)?;
        let graph = call_graph(&compiled.grammar, None);
        let report = CallGraphReport {
            start_rule: graph.start_rule.clone(),
            mermaid: call_graph_mermaid(&graph),
            nodes: graph.nodes,
            cycles: graph.cycles,
        };
        self.cache.put_analysis(key, &report);
        Ok(report)
    }

    pub fn analyze_complexity(
        &self,
        source: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<ComplexityReport> {
        let key = content_key(&[source, "complexity"]);
        if let Some(report) = self.cache.get_analysis(&key) {
            return Ok(report);
        }
        let compiled = self.compile(source, request)?;
        let graph = call_graph(&compiled.grammar, None);
        let report = complexity(&compiled.grammar, &compiled.atn, &graph);
        self.cache.put_analysis(key, &report);
        Ok(report)
    }

    pub fn analyze_left_recursion(
        &self,
        source: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<LeftRecursionReport> {
        let key = content_key(&[source, "leftrec"]);
        if let Some(report) = self.cache.get_analysis(&key) {
            return Ok(report);
        }
        let compiled = self.compile(source, request)?;
        let graph = call_graph(&compiled.grammar, None);
        let report = left_recursion_report(&compiled.grammar, &compiled.atn, &graph);
        self.cache.put_analysis(key, &report);
        Ok(report)
    }

    pub fn analyze_first_follow(
        &self,
        source: &str,
        rule: Option<&str>,
        request: &mut Request<'_>,
    ) -> EngineResult<FirstFollowReport> {
        let compiled = self.compile(source, request)?;
        let grammar = &compiled.grammar;
        let ff = first_follow(grammar);
        let decisions = decision_lookahead(grammar, &compiled.atn, &ff);
        Ok(first_follow_report(grammar, &compiled.atn, &ff, &decisions, rule))
    }

    pub fn visualize_atn(
        &self,
        source: &str,
        rule: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<AtnVisualization> {
        let compiled = self.compile(source, request)?;
        let atn = &compiled.atn;
        let Some(info) = atn.rule_by_name(rule) else {
            return Err(EngineError::of(
                ErrorKind::UndefinedRule,
                format!("rule '{rule}' is not defined in this grammar"),
            ));
        };
        let graph = render::atn_graph(atn, &compiled.grammar.vocabulary, Some(info.id));
        let states: Vec<_> = atn.states_of_rule(info.id).collect();
        Ok(AtnVisualization {
            rule: rule.to_owned(),
            state_count: states.len(),
            transition_count: states.iter().map(|s| s.transitions.len()).sum(),
            decision_count: atn.decisions_of_rule(info.id).count(),
            dot: graph.to_dot(),
            mermaid: graph.to_mermaid_states(),
            svg: None,
        })
    }

    pub fn visualize_decision(
        &self,
        source: &str,
        rule: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<DecisionVisualization> {
        let compiled = self.compile(source, request)?;
        let atn = &compiled.atn;
        let Some(info) = atn.rule_by_name(rule) else {
            return Err(EngineError::of(
                ErrorKind::UndefinedRule,
                format!("rule '{rule}' is not defined in this grammar"),
            ));
        };
        let decisions = atn
            .decisions_of_rule(info.id)
            .map(|decision| {
                let graph = render::decision_graph(
                    atn,
                    &compiled.grammar.vocabulary,
                    decision.id,
                );
                DecisionViz {
                    decision: decision.id as usize,
                    state: decision.state as usize,
                    alternatives: atn.alternative_count(decision.id),
                    dot: graph.to_dot(),
                }
            })
            .collect();
        Ok(DecisionVisualization {
            rule: rule.to_owned(),
            decisions,
        })
    }

    /// Profiled parse of one sample.
    pub fn profile(
        &self,
        source: &str,
        input: &str,
        start_rule: Option<&str>,
        request: &mut Request<'_>,
    ) -> EngineResult<ProfileReport> {
        self.check_input_size(input)?;
        let compiled = self.compile(source, request)?;
        let atn = &compiled.atn;

        let mut recorder = ProfileRecorder::new();
        let (parse, dfa_sizes) =
            self.run_parse(&compiled, input, start_rule, &request.cancel, &mut recorder)?;

        let decisions = recorder
            .decisions()
            .iter()
            .map(|stats| DecisionProfileInfo {
                decision: stats.decision as usize,
                rule: atn.rule(stats.rule).name.clone(),
                invocations: stats.invocations,
                time_us: stats.time_us,
                sll_lookahead_total: stats.sll_lookahead_total,
                sll_lookahead_min: if stats.sll_lookahead_min == u64::MAX {
                    0
                } else {
                    stats.sll_lookahead_min
                },
                sll_lookahead_max: stats.sll_lookahead_max,
                ll_fallbacks: stats.ll_fallbacks,
                ll_lookahead_total: stats.ll_lookahead_total,
                atn_transitions: stats.atn_transitions,
                dfa_transitions: stats.dfa_transitions,
                ambiguities: stats.ambiguities,
                context_sensitivities: stats.context_sensitivities,
                errors: stats.errors,
                dfa_states: dfa_sizes
                    .iter()
                    .find(|(decision, _)| *decision == stats.decision)
                    .map_or(0, |(_, size)| *size),
            })
            .collect();

        let ambiguities = recorder
            .ambiguities()
            .iter()
            .map(|event| {
                let rule_name = atn.rule(event.rule).name.clone();
                ambiguity_info(event, &rule_name, input, atn)
            })
            .collect();

        Ok(ProfileReport {
            parse,
            decisions,
            ambiguities,
        })
    }

    pub fn generate_test_inputs(
        &self,
        source: &str,
        rule: &str,
        max_count: usize,
        request: &mut Request<'_>,
    ) -> EngineResult<GeneratedTestInputs> {
        let compiled = self.compile(source, request)?;
        if compiled.grammar.rule(rule).is_none() {
            return Err(EngineError::of(
                ErrorKind::UndefinedRule,
                format!("rule '{rule}' is not defined in this grammar"),
            ));
        }
        Ok(GeneratedTestInputs {
            rule: rule.to_owned(),
            inputs: generate_inputs(&compiled.grammar, rule, max_count),
        })
    }

    /// The code-generation contract: artifact listing per target.
    pub fn generate_code(
        &self,
        source: &str,
        target: &str,
        request: &mut Request<'_>,
    ) -> EngineResult<CodegenReport> {
        let compiled = self.compile(source, request)?;
        codegen::generate(&compiled.grammar.name, compiled.grammar.kind, target).ok_or_else(|| {
            EngineError::of(
                ErrorKind::InvalidInput,
                format!(
                    "unsupported target '{target}'; expected one of {}",
                    codegen::TARGETS.join(", ")
                ),
            )
        })
    }

    /// Embedded-code scan over raw grammar text (no full parse needed).
    pub fn scan_embedded(&self, source: &str) -> EngineResult<EmbeddedCodeReport> {
        self.check_grammar_size(source)?;
        Ok(embedded::scan(source))
    }
}

// =========================================================================
// Report assembly helpers
// =========================================================================

fn rule_counts(grammar: &GrammarSource) -> RuleCounts {
    let mut counts = RuleCounts::default();
    for rule in grammar.rules.values() {
        match rule.kind {
            RuleKind::Parser => counts.parser += 1,
            RuleKind::Lexer => counts.lexer += 1,
            RuleKind::Fragment => counts.fragment += 1,
        }
    }
    counts
}

fn failed_report(start_rule: &str, error: ErrorDetail) -> ParseReport {
    ParseReport {
        success: false,
        start_rule: start_rule.to_owned(),
        tree: None,
        lisp: None,
        tokens: Vec::new(),
        errors: vec![error],
        warnings: Vec::new(),
        timing: TimingInfo::default(),
    }
}

fn token_info(token: &Token<'_>, grammar: &GrammarSource) -> TokenInfo {
    let type_name = if token.is_error() {
        "<error>".to_owned()
    } else {
        grammar.vocabulary.display_name(token.token_type)
    };
    TokenInfo {
        index: token.index,
        token_type: type_name,
        text: token.text.to_owned(),
        line: token.line,
        column: token.column,
        start: token.start,
        stop: token.stop,
        channel: token.channel,
    }
}

fn tree_to_report(tree: &ParseTree, tokens: &[Token<'_>], grammar: &GrammarSource) -> TreeNode {
    match tree {
        ParseTree::Rule(node) => {
            let (start, stop) = if node.stop_token > node.start_token {
                let first = &tokens[node.start_token.min(tokens.len() - 1)];
                let last = &tokens[(node.stop_token - 1).min(tokens.len() - 1)];
                (first.start, last.stop)
            } else {
                let at = tokens
                    .get(node.start_token)
                    .map_or(0, |t| t.start);
                (at, at)
            };
            TreeNode::Rule {
                rule: node.name.clone(),
                alt: node.alt,
                children: node
                    .children
                    .iter()
                    .map(|c| tree_to_report(c, tokens, grammar))
                    .collect(),
                start,
                stop,
            }
        }
        ParseTree::Terminal(terminal) => TreeNode::Terminal {
            token_type: grammar.vocabulary.display_name(terminal.token_type),
            text: terminal.text.clone(),
            line: terminal.line,
            column: terminal.column,
        },
        ParseTree::Error(error) => TreeNode::Error {
            text: error.text.clone(),
        },
    }
}

fn ambiguity_info(
    event: &gramspect_vm::AmbiguityEvent,
    rule_name: &str,
    input: &str,
    atn: &Atn,
) -> AmbiguityEventInfo {
    // Re-lex to find the span text; events carry indices into the
    // default-channel stream.
    let budget = Budget::unlimited();
    let text = lex(atn, input, &budget)
        .ok()
        .map(|lexed| {
            let tokens = default_channel(&lexed.tokens);
            span_text(input, &tokens, event.start_index, event.stop_index)
        })
        .unwrap_or_default();
    AmbiguityEventInfo {
        decision: event.decision as usize,
        rule: rule_name.to_owned(),
        start_index: event.start_index,
        stop_index: event.stop_index,
        alternatives: event.alternatives.clone(),
        full_context: event.full_context,
        text,
    }
}

fn span_text(input: &str, tokens: &[Token<'_>], start: usize, stop: usize) -> String {
    let Some(first) = tokens.get(start.min(tokens.len().saturating_sub(1))) else {
        return String::new();
    };
    let last = tokens
        .get(stop.min(tokens.len().saturating_sub(1)))
        .unwrap_or(first);
    let from = first.start.min(input.len());
    let to = last.stop.clamp(from, input.len());
    input[from..to].to_owned()
}

fn call_graph_mermaid(graph: &CallGraph) -> String {
    let mut digraph = Digraph::new("calls");
    for node in &graph.nodes {
        digraph.node(node.rule.clone(), node.rule.clone(), NodeShape::Box);
    }
    for node in &graph.nodes {
        for callee in &node.calls {
            digraph.edge(node.rule.clone(), callee.clone());
        }
    }
    digraph.to_mermaid_flow()
}

fn first_follow_report(
    grammar: &GrammarSource,
    atn: &Atn,
    ff: &FirstFollow,
    decisions: &[DecisionSets],
    rule_filter: Option<&str>,
) -> FirstFollowReport {
    let names = |set: &gramspect_atn::IntervalSet| -> Vec<String> {
        set.values()
            .map(|t| grammar.vocabulary.display_name(t))
            .collect()
    };

    let rules = grammar
        .parser_rules()
        .filter(|r| rule_filter.is_none_or(|f| f == r.name))
        .map(|rule| RuleSets {
            rule: rule.name.clone(),
            nullable: ff.nullable.get(&rule.name).copied().unwrap_or(false),
            first: ff
                .first
                .get(&rule.name)
                .map(&names)
                .unwrap_or_default(),
            follow: ff
                .follow
                .get(&rule.name)
                .map(&names)
                .unwrap_or_default(),
        })
        .collect();

    let decisions = decisions
        .iter()
        .filter(|d| {
            rule_filter.is_none_or(|f| atn.rule(d.rule).name == f)
        })
        .map(|d| gramspect_core::reports::DecisionLookahead {
            decision: d.decision as usize,
            rule: atn.rule(d.rule).name.clone(),
            alternatives: d.alternatives.iter().map(&names).collect(),
            ambiguous_by_lookahead: d.ambiguous_by_lookahead,
        })
        .collect();

    FirstFollowReport { rules, decisions }
}

/// Converts front-end diagnostics into taxonomy entries, classifying by
/// message shape (the diagnostics themselves are untyped).
fn split_diagnostics(
    diagnostics: &gramspect_syntax::Diagnostics,
    line_index: &LineIndex,
    errors: &mut Vec<ErrorDetail>,
    warnings: &mut Vec<ErrorDetail>,
) {
    for message in diagnostics.iter() {
        let detail = diag_to_detail(message, line_index);
        if detail.is_error() {
            errors.push(detail);
        } else {
            warnings.push(detail);
        }
    }
}

fn diag_to_detail(message: &DiagnosticMessage, line_index: &LineIndex) -> ErrorDetail {
    let text = message.message();
    let kind = if text.contains("undefined rule") || text.contains("undefined token") {
        ErrorKind::UndefinedRule
    } else if text.contains("left-recursive") {
        ErrorKind::LeftRecursion
    } else if text.starts_with("expected")
        || text.starts_with("unterminated")
        || text.starts_with("unexpected")
        || text.contains("nests too deeply")
    {
        ErrorKind::SyntaxError
    } else {
        ErrorKind::SemanticError
    };
    let mut detail = match message.severity() {
        Severity::Error => ErrorDetail::new(kind, text),
        Severity::Warning => ErrorDetail::warning(kind, text),
        Severity::Info => ErrorDetail::info(kind, text),
    };
    detail = detail.at(line_index.location(message.range().start()));
    detail
}

fn import_error(error: &ImportError) -> EngineError {
    let detail = ErrorDetail::new(ErrorKind::ImportError, error.to_string());
    EngineError::single(detail)
}
