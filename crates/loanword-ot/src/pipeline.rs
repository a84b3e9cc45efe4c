//! Cascade assembly and composition.
//!
//! A cascade has three parts. The source side (source morphology and the
//! source-language operations) is composed once. The adaptation stages stay
//! separate so they can be folded against whichever side of a sample is
//! smaller. The target side attaches target morphology.
//!
//! ```text
//!   vocabulary ∘ source side ∘ stage 1 ∘ ... ∘ stage n ∘ target side ∘ targets
//!   \______ restrict_source ______/   \___________ restrict_target ___________/
//! ```

use std::path::PathBuf;
use std::time::Instant;

use loanword_core::weights::BIAS;
use loanword_core::{Alphabet, hash};
use loanword_fst::weight::ONE;
use loanword_fst::{Label, VectorFst, compose};
use serde::{Deserialize, Serialize};

use crate::cache::{self, CacheLayout};
use crate::decode::{self, DecodedPath};
use crate::error::{OtError, PipelineError};
use crate::rules::{Builder, Mode, Phase, Rule, add_boundary_loops, add_marker_loops, identity_arcs};

const SOURCE_SIDE: &str = "source side";
const ADAPTATION: &str = "adaptation";
const TARGET_SIDE: &str = "target side";

/// The stage lists of a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub source_side: Vec<Rule>,
    pub adaptation: Vec<Rule>,
    pub target_side: Vec<Rule>,
    /// Keep syllable boundaries in the output instead of removing them.
    pub with_syllabification: bool,
}

impl PipelineSpec {
    /// The full Arabic-Swahili style cascade.
    pub fn standard(with_syllabification: bool, min_consonants: usize) -> Self {
        let mut adaptation = vec![
            Rule::Degemination,
            Rule::PhoneSubstitution,
            Rule::Epenthesis,
            Rule::FinalVowelSubstitution,
            Rule::Syllabification,
            Rule::NoCoda,
            Rule::NoComplex,
            Rule::NoComplexMargin,
            Rule::NoComplexVowel,
            Rule::Onset,
            Rule::Peak,
            Rule::Ssp,
            Rule::Length,
        ];
        if !with_syllabification {
            adaptation.push(Rule::Unsyllabification);
        }
        Self {
            source_side: vec![
                Rule::SourceMorphology,
                Rule::VowelDeletion,
                Rule::MinConsonantCount(min_consonants),
            ],
            adaptation,
            target_side: vec![Rule::TargetMorphology],
            with_syllabification,
        }
    }

    /// Checks that every stage sits on its side and that adaptation stages
    /// follow the phase order.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for rule in &self.source_side {
            check_side(rule, SOURCE_SIDE)?;
        }
        for rule in &self.target_side {
            check_side(rule, TARGET_SIDE)?;
        }

        let mut previous: Option<&Rule> = None;
        let mut syllabified = false;
        for rule in &self.adaptation {
            check_side(rule, ADAPTATION)?;
            if let Some(prev) = previous {
                let repeated = *rule == Rule::Syllabification && syllabified;
                if rule.phase() < prev.phase() || repeated {
                    return Err(PipelineError::StageOrder {
                        stage: rule.name(),
                        previous: prev.name(),
                    });
                }
            }
            match rule.phase() {
                Phase::Syllabify => syllabified = true,
                Phase::Prosodic | Phase::Unsyllabify if !syllabified => {
                    return Err(PipelineError::MissingSyllabification(rule.name()));
                }
                _ => {}
            }
            previous = Some(rule);
        }
        Ok(())
    }

    /// True when the cascade removes the boundaries it inserted.
    pub fn unsyllabifies(&self) -> bool {
        self.adaptation.contains(&Rule::Unsyllabification)
    }

    /// Hash of the stage lists and flags.
    pub fn structure_hash(&self) -> String {
        let mut text = String::new();
        for (side, rules) in [
            (SOURCE_SIDE, &self.source_side),
            (ADAPTATION, &self.adaptation),
            (TARGET_SIDE, &self.target_side),
        ] {
            text.push_str(side);
            for rule in rules {
                text.push(' ');
                text.push_str(&rule.name());
            }
            text.push('\n');
        }
        text.push_str(&format!("syllabified {}\n", self.with_syllabification));
        hash::digest_hex(text.as_bytes())
    }
}

fn home_side(rule: &Rule) -> &'static str {
    match rule {
        Rule::SourceMorphology | Rule::VowelDeletion | Rule::MinConsonantCount(_) => SOURCE_SIDE,
        Rule::TargetMorphology => TARGET_SIDE,
        _ => ADAPTATION,
    }
}

fn check_side(rule: &Rule, side: &'static str) -> Result<(), PipelineError> {
    let expected = home_side(rule);
    if expected == side {
        Ok(())
    } else {
        Err(PipelineError::WrongSide {
            stage: rule.name(),
            expected,
        })
    }
}

/// Which partial composition of a traced pair came out empty, and the best
/// paths when none did.
#[derive(Debug, Clone, Default)]
pub struct TraceReport {
    pub source_side_empty: bool,
    pub source_adaptation_empty: bool,
    pub adaptation_target_empty: bool,
    pub paths: Vec<DecodedPath>,
}

impl TraceReport {
    pub fn is_reachable(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// A built cascade: the composed source side, the adaptation stage
/// automatons in order, and the composed target side.
#[derive(Debug, Clone)]
pub struct Pipeline {
    spec: PipelineSpec,
    mode: Mode,
    source_side: VectorFst,
    adaptation: Vec<(Rule, VectorFst)>,
    target_side: VectorFst,
}

impl Pipeline {
    pub fn build(spec: &PipelineSpec, alphabet: &Alphabet, mode: Mode) -> Result<Self, OtError> {
        Self::assemble(spec, alphabet, mode, None)
    }

    /// Like [`Pipeline::build`], reading and writing every part under the
    /// cache layout.
    pub fn build_cached(
        spec: &PipelineSpec,
        alphabet: &Alphabet,
        mode: Mode,
        layout: &CacheLayout,
    ) -> Result<Self, OtError> {
        Self::assemble(spec, alphabet, mode, Some(layout))
    }

    fn assemble(
        spec: &PipelineSpec,
        alphabet: &Alphabet,
        mode: Mode,
        layout: Option<&CacheLayout>,
    ) -> Result<Self, OtError> {
        spec.validate()?;
        let b = Builder::new(alphabet, mode, spec.with_syllabification);
        let part = |path: Option<PathBuf>, build: &dyn Fn() -> Result<VectorFst, OtError>| match path {
            Some(p) => cache::fst_or_build(&p, build),
            None => build(),
        };

        let source_side = part(layout.map(CacheLayout::source_side), &|| {
            compose_stages(&b, &spec.source_side)
        })?;
        let adaptation = spec
            .adaptation
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let fst = part(layout.map(|l| l.adaptation_stage(i, rule)), &|| rule.build(&b))?;
                Ok((*rule, fst))
            })
            .collect::<Result<Vec<_>, OtError>>()?;
        let target_side = part(layout.map(CacheLayout::target_side), &|| {
            compose_stages(&b, &spec.target_side)
        })?;

        tracing::debug!(
            mode = %mode,
            source_states = source_side.num_states(),
            stages = adaptation.len(),
            target_states = target_side.num_states(),
            "pipeline ready"
        );
        Ok(Self {
            spec: spec.clone(),
            mode,
            source_side,
            adaptation,
            target_side,
        })
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_side(&self) -> &VectorFst {
        &self.source_side
    }

    pub fn adaptation(&self) -> &[(Rule, VectorFst)] {
        &self.adaptation
    }

    pub fn target_side(&self) -> &VectorFst {
        &self.target_side
    }

    /// The whole cascade as one automaton, composed left to right.
    ///
    /// Unrestricted cascades grow quickly; prefer the restricted forms for
    /// real vocabularies.
    pub fn compose(&self) -> VectorFst {
        let mut acc = self.source_side.clone();
        for (_, stage) in &self.adaptation {
            acc = compose(&acc, stage);
        }
        compose(&acc, &self.target_side)
    }

    /// `vocabulary ∘ source side`.
    pub fn restrict_source(&self, vocabulary: &VectorFst) -> VectorFst {
        compose(vocabulary, &self.source_side)
    }

    /// `stage 1 ∘ ... ∘ stage n ∘ target side ∘ targets`, folded from the
    /// right so every step is restricted by the targets.
    pub fn restrict_target(&self, targets: &VectorFst) -> VectorFst {
        let mut acc = compose(&self.target_side, targets);
        for (rule, stage) in self.adaptation.iter().rev() {
            if acc.is_empty() {
                break;
            }
            let started = Instant::now();
            acc = compose(stage, &acc);
            tracing::debug!(
                stage = %rule,
                states = acc.num_states(),
                arcs = acc.num_arcs(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "restricted stage"
            );
        }
        acc
    }

    /// Acceptor for the target pronunciations as they leave the cascade:
    /// with marker loops in annotate mode and boundary loops when the
    /// cascade keeps its syllabification.
    pub fn target_acceptor(&self, pronunciations: &[Vec<Label>], alphabet: &Alphabet) -> VectorFst {
        let mut fst = VectorFst::from_sequences(pronunciations.iter().map(Vec::as_slice));
        if self.mode == Mode::Annotate {
            add_marker_loops(&mut fst, alphabet);
        }
        if self.spec.with_syllabification {
            add_boundary_loops(&mut fst, alphabet);
        }
        fst
    }

    /// One-state automaton that copies phones and boundaries and charges
    /// every marker its registered weight. Annotate-mode outputs composed
    /// with it carry the same costs a weighted cascade would.
    pub fn scoring_automaton(&self, alphabet: &Alphabet) -> Result<VectorFst, OtError> {
        let mut fst = VectorFst::new();
        fst.add_state();
        identity_arcs(&mut fst, 0, 0, &alphabet.boundaries());
        identity_arcs(&mut fst, 0, 0, alphabet.letters());
        for (marker, w) in alphabet.markers() {
            fst.add_arc(0, 0, marker, marker, w);
        }
        let final_weight = if self.spec.unsyllabifies() {
            alphabet.constraint_weight(BIAS)?
        } else {
            ONE
        };
        fst.set_final(0, final_weight);
        Ok(fst)
    }

    /// Weights the paths of a cascade output: annotate-mode outputs go
    /// through the scoring automaton, weighted outputs already carry costs.
    pub fn score(&self, fst: &VectorFst, alphabet: &Alphabet) -> Result<VectorFst, OtError> {
        match self.mode {
            Mode::Annotate => Ok(compose(fst, &self.scoring_automaton(alphabet)?)),
            Mode::Weighted => Ok(fst.clone()),
        }
    }

    /// Runs one source pronunciation through the cascade towards one target
    /// pronunciation, reporting where the composition died.
    pub fn trace(
        &self,
        source: &[Label],
        target: &[Label],
        alphabet: &Alphabet,
        num_paths: usize,
    ) -> Result<TraceReport, OtError> {
        let mut report = TraceReport::default();
        let mut acc = self.restrict_source(&VectorFst::linear_chain(source));
        if acc.is_empty() {
            report.source_side_empty = true;
            return Ok(report);
        }
        for (_, stage) in &self.adaptation {
            acc = compose(&acc, stage);
            if acc.is_empty() {
                report.source_adaptation_empty = true;
                return Ok(report);
            }
        }
        let targets = self.target_acceptor(&[target.to_vec()], alphabet);
        let full = compose(&acc, &compose(&self.target_side, &targets));
        if full.is_empty() {
            report.adaptation_target_empty = true;
            return Ok(report);
        }
        report.paths = decode::decode(&self.score(&full, alphabet)?, alphabet, num_paths);
        Ok(report)
    }
}

/// Composes the automatons of `rules` left to right; an empty list is the
/// identity.
fn compose_stages(b: &Builder<'_>, rules: &[Rule]) -> Result<VectorFst, OtError> {
    let mut acc: Option<VectorFst> = None;
    for rule in rules {
        let fst = rule.build(b)?;
        acc = Some(match acc {
            None => fst,
            Some(prev) => compose(&prev, &fst),
        });
    }
    Ok(match acc {
        Some(fst) => fst,
        None => {
            let mut id = VectorFst::new();
            id.add_state();
            identity_arcs(&mut id, 0, 0, &b.base_symbols());
            id.set_final(0, ONE);
            b.finish(id)
        }
    })
}
