//! Nelder-Mead search over constraint weights.
//!
//! A vertex of the simplex is a weight vector with its score, `1 - accuracy`;
//! lower is better. Scores are memoized by the content hash of the weight
//! vector, in memory and under `work_dir/scores`, so a restarted search or a
//! revisited point costs nothing.
//!
//! The initial simplex and shrink steps evaluate their vertices as one batch
//! on a bounded rayon pool. Reflection, expansion and contraction evaluate
//! one point each.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use hashbrown::HashMap;
use loanword_core::WeightVector;
use rayon::prelude::*;
use serde::Serialize;

use crate::cache;
use crate::config::{OptimizeConfig, RunConfig};
use crate::error::OtError;
use crate::rules::Mode;
use crate::runner::Run;

pub const REFLECT: f64 = 1.0;
pub const EXPAND: f64 = 2.0;
pub const CONTRACT: f64 = -0.5;
pub const SHRINK: f64 = 0.5;

/// Something that scores weight vectors by accuracy.
pub trait Objective: Sync {
    /// Accuracy of `weights`, in `[0, 1]`.
    fn accuracy(&self, weights: &WeightVector) -> Result<f64, OtError>;
}

/// Runs the adaptation in process with the weights as a weighted cascade
/// and evaluates its results.
#[derive(Debug, Clone)]
pub struct AdaptationObjective {
    config: RunConfig,
}

impl AdaptationObjective {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            config: RunConfig {
                mode: Mode::Weighted,
                ..config.clone()
            },
        }
    }
}

impl Objective for AdaptationObjective {
    fn accuracy(&self, weights: &WeightVector) -> Result<f64, OtError> {
        let run = Run::prepare_with_weights(&self.config, weights)?;
        run.execute()?;
        Ok(run.evaluate()?.accuracy)
    }
}

/// Runs `command --weights <file>` and reads the accuracy from the last
/// non-empty line it prints.
#[derive(Debug, Clone)]
pub struct CommandObjective {
    program: String,
    args: Vec<String>,
    weights_dir: PathBuf,
}

impl CommandObjective {
    /// `command` is split on whitespace; weight files are written under
    /// `work_dir/weights`.
    pub fn new(command: &str, work_dir: &Path) -> Result<Self, OtError> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| OtError::Optimizer("empty evaluation command".to_string()))?;
        Ok(Self {
            program,
            args: words.collect(),
            weights_dir: work_dir.join("weights"),
        })
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Objective for CommandObjective {
    fn accuracy(&self, weights: &WeightVector) -> Result<f64, OtError> {
        let path = self.weights_dir.join(format!("{}.txt", weights.content_hash()));
        weights.write(&path)?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--weights")
            .arg(&path)
            .output()
            .map_err(|e| OtError::io(&self.program, e))?;
        if !output.status.success() {
            return Err(OtError::ExternalEvaluationFailure {
                command: self.command_line(),
                status: output.status.to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let last = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or_default();
        last.trim().parse().map_err(|_| {
            OtError::Optimizer(format!("`{}` printed no accuracy: {last:?}", self.command_line()))
        })
    }
}

/// Which move produced the current simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Initial,
    Expansion,
    Reflection,
    Contraction,
    Shrink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub score: f64,
    pub point: Vec<f64>,
}

/// Logged and appended to `iterations.jsonl` after every step.
#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    pub iteration: usize,
    pub step: Step,
    pub best_score: f64,
    pub best_accuracy: f64,
    pub best_weights: BTreeMap<String, f64>,
}

/// Best point found by a search.
#[derive(Debug, Clone)]
pub struct Optimum {
    pub weights: WeightVector,
    pub score: f64,
    pub iterations: usize,
}

fn clamp(point: &mut [f64]) {
    for x in point.iter_mut() {
        if *x < 0.0 {
            *x = 0.0;
        }
    }
}

/// `a + t * (a - b)`, clamped to non-negative weights.
fn affine(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    let mut p: Vec<f64> = a.iter().zip(b).map(|(x, y)| x + t * (x - y)).collect();
    clamp(&mut p);
    p
}

pub struct NelderMead<'a, O: Objective> {
    objective: &'a O,
    config: &'a OptimizeConfig,
    names: Vec<String>,
    pool: rayon::ThreadPool,
    memo: Mutex<HashMap<String, f64>>,
    vertices: Vec<Vertex>,
}

impl<'a, O: Objective> NelderMead<'a, O> {
    /// Builds and scores the initial simplex around `initial`.
    pub fn new(objective: &'a O, config: &'a OptimizeConfig, initial: &WeightVector) -> Result<Self, OtError> {
        if initial.is_empty() {
            return Err(OtError::Optimizer("no constraint weights to optimize".to_string()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_parallel_vertices.max(1))
            .build()
            .map_err(|e| OtError::Optimizer(e.to_string()))?;
        let mut search = Self {
            objective,
            config,
            names: initial.names().map(str::to_string).collect(),
            pool,
            memo: Mutex::new(HashMap::new()),
            vertices: Vec::new(),
        };

        let mut x0 = initial.to_point();
        clamp(&mut x0);
        let mut points = vec![x0.clone()];
        for i in 0..x0.len() {
            let mut p = x0.clone();
            p[i] += config.simplex_radius;
            points.push(p);
        }
        search.vertices = search.score_batch(points)?;
        search.sort();
        search.report(0, Step::Initial)?;
        Ok(search)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn best(&self) -> &Vertex {
        &self.vertices[0]
    }

    pub fn weights(&self, point: &[f64]) -> WeightVector {
        WeightVector::from_point(&self.names, point)
    }

    fn sort(&mut self) {
        self.vertices.sort_by(|a, b| a.score.total_cmp(&b.score));
    }

    /// Score of `point`, from the memo when it has been seen before.
    fn score(&self, point: &[f64]) -> Result<f64, OtError> {
        let weights = self.weights(point);
        let key = weights.content_hash();
        if let Some(&s) = self.memo.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(s);
        }
        let path = self.config.work_dir.join("scores").join(&key);
        let stored = cache::read_text(&path)?.and_then(|t| t.trim().parse::<f64>().ok());
        let score = match stored {
            Some(s) => s,
            None => {
                let started = Instant::now();
                let accuracy = self.objective.accuracy(&weights)?;
                let s = 1.0 - accuracy;
                cache::write_text(&path, &format!("{s}\n"))?;
                tracing::info!(
                    weights = %key,
                    accuracy,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "evaluated weights"
                );
                s
            }
        };
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, score);
        Ok(score)
    }

    /// Scores every point on the pool; the batch fails if any point fails.
    fn score_batch(&self, points: Vec<Vec<f64>>) -> Result<Vec<Vertex>, OtError> {
        let scores = self
            .pool
            .install(|| points.par_iter().map(|p| self.score(p)).collect::<Result<Vec<_>, _>>())?;
        Ok(scores
            .into_iter()
            .zip(points)
            .map(|(score, point)| Vertex { score, point })
            .collect())
    }

    fn vertex(&self, point: Vec<f64>) -> Result<Vertex, OtError> {
        Ok(Vertex {
            score: self.score(&point)?,
            point,
        })
    }

    /// One Nelder-Mead iteration. The simplex is sorted on return.
    pub fn step(&mut self) -> Result<Step, OtError> {
        self.sort();
        let n = self.vertices.len();
        let dim = self.names.len();
        let mut centroid = vec![0.0; dim];
        for v in &self.vertices[..n - 1] {
            for (c, x) in centroid.iter_mut().zip(&v.point) {
                *c += x / (n - 1) as f64;
            }
        }
        let worst = self.vertices[n - 1].point.clone();

        let reflection = self.vertex(affine(&centroid, &worst, REFLECT))?;
        let step = if reflection.score < self.vertices[0].score {
            let expansion = self.vertex(affine(&centroid, &worst, EXPAND))?;
            if expansion.score < reflection.score {
                self.vertices[n - 1] = expansion;
                Step::Expansion
            } else {
                self.vertices[n - 1] = reflection;
                Step::Reflection
            }
        } else if reflection.score < self.vertices[n - 2].score {
            self.vertices[n - 1] = reflection;
            Step::Reflection
        } else {
            let contraction = self.vertex(affine(&centroid, &worst, CONTRACT))?;
            if contraction.score < self.vertices[n - 1].score {
                self.vertices[n - 1] = contraction;
                Step::Contraction
            } else {
                let best = self.vertices[0].point.clone();
                let points = self.vertices[1..]
                    .iter()
                    .map(|v| affine(&best, &v.point, -SHRINK))
                    .collect();
                let shrunk = self.score_batch(points)?;
                self.vertices.truncate(1);
                self.vertices.extend(shrunk);
                Step::Shrink
            }
        };
        self.sort();
        Ok(step)
    }

    fn report(&self, iteration: usize, step: Step) -> Result<(), OtError> {
        let best = self.best();
        let weights = self.weights(&best.point);
        let report = IterationReport {
            iteration,
            step,
            best_score: best.score,
            best_accuracy: 1.0 - best.score,
            best_weights: weights.iter().map(|(k, v)| (k.to_string(), v)).collect(),
        };
        tracing::info!(iteration, ?step, best_accuracy = report.best_accuracy, "nelder-mead step");

        let dir = &self.config.work_dir;
        std::fs::create_dir_all(dir).map_err(|e| OtError::io(dir, e))?;
        let path = dir.join("iterations.jsonl");
        let mut line = serde_json::to_string(&report)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
            .map_err(|e| OtError::io(&path, e))?;
        weights.write(&dir.join("best_weights.txt"))?;
        Ok(())
    }

    /// Iterates up to the configured cap.
    pub fn run(mut self) -> Result<Optimum, OtError> {
        for iteration in 1..=self.config.max_iterations {
            let step = self.step()?;
            self.report(iteration, step)?;
        }
        let best = self.best();
        Ok(Optimum {
            weights: self.weights(&best.point),
            score: best.score,
            iterations: self.config.max_iterations,
        })
    }
}

/// Searches from `initial` for the weights with the best accuracy.
pub fn optimize<O: Objective>(
    objective: &O,
    config: &OptimizeConfig,
    initial: &WeightVector,
) -> Result<Optimum, OtError> {
    NelderMead::new(objective, config, initial)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accuracy peaks at 1.0 when every weight equals its target.
    struct Bowl {
        target: Vec<f64>,
        calls: AtomicUsize,
    }

    impl Objective for Bowl {
        fn accuracy(&self, weights: &WeightVector) -> Result<f64, OtError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let d: f64 = weights
                .to_point()
                .iter()
                .zip(&self.target)
                .map(|(x, t)| (x - t).powi(2))
                .sum();
            Ok(1.0 / (1.0 + d / 100.0))
        }
    }

    struct Failing;

    impl Objective for Failing {
        fn accuracy(&self, _: &WeightVector) -> Result<f64, OtError> {
            Err(OtError::ExternalEvaluationFailure {
                command: "eval".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }

    fn config(work_dir: &Path, parallel: usize) -> OptimizeConfig {
        OptimizeConfig {
            max_iterations: 30,
            simplex_radius: 5.0,
            num_parallel_vertices: parallel,
            work_dir: work_dir.to_path_buf(),
            command: None,
            initial_weights: None,
        }
    }

    fn initial() -> WeightVector {
        WeightVector::from_pairs([("<<A>>", 0.0), ("<<B>>", 0.0), ("<<C>>", 0.0)])
    }

    #[test]
    fn simplex_keeps_its_size_and_never_worsens() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        let bowl = Bowl {
            target: vec![3.0, 8.0, 1.0],
            calls: AtomicUsize::new(0),
        };
        let mut nm = NelderMead::new(&bowl, &cfg, &initial()).unwrap();
        assert_eq!(nm.vertices().len(), 4);
        let mut best = nm.best().score;
        for _ in 0..cfg.max_iterations {
            nm.step().unwrap();
            assert_eq!(nm.vertices().len(), 4);
            assert!(nm.best().score <= best);
            assert!(nm.vertices().iter().all(|v| v.point.iter().all(|&x| x >= 0.0)));
            best = nm.best().score;
        }
    }

    #[test]
    fn scores_are_memoized_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1);
        let bowl = Bowl {
            target: vec![1.0, 1.0, 1.0],
            calls: AtomicUsize::new(0),
        };
        let first = optimize(&bowl, &cfg, &initial()).unwrap();
        let calls = bowl.calls.load(Ordering::SeqCst);
        assert!(calls > 0);
        assert!(dir.path().join("best_weights.txt").exists());
        let iterations = std::fs::read_to_string(dir.path().join("iterations.jsonl")).unwrap();
        assert_eq!(iterations.lines().count(), cfg.max_iterations + 1);

        // A second search over the same points evaluates nothing new.
        let again = optimize(&bowl, &cfg, &initial()).unwrap();
        assert_eq!(bowl.calls.load(Ordering::SeqCst), calls);
        assert_eq!(again.weights, first.weights);
        assert_eq!(WeightVector::load(&dir.path().join("best_weights.txt")).unwrap(), first.weights);
    }

    #[test]
    fn failures_abort_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        let err = NelderMead::new(&Failing, &cfg, &initial()).err().unwrap();
        assert!(matches!(err, OtError::ExternalEvaluationFailure { .. }));
        assert!(matches!(
            NelderMead::new(&Failing, &cfg, &WeightVector::new()).err().unwrap(),
            OtError::Optimizer(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_objective_reads_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = CommandObjective::new("./eval.sh --accuracy_at_n 1", dir.path()).unwrap();
        assert_eq!(parsed.program, "./eval.sh");
        assert_eq!(parsed.args, vec!["--accuracy_at_n", "1"]);
        assert!(CommandObjective::new("  ", dir.path()).is_err());

        let objective = CommandObjective {
            program: "sh".to_string(),
            args: vec!["-c".into(), "echo loading; echo 0.75; echo".into(), "sh".into()],
            weights_dir: dir.path().join("weights"),
        };
        assert_eq!(objective.accuracy(&initial()).unwrap(), 0.75);
        assert!(dir.path().join("weights").join(format!("{}.txt", initial().content_hash())).exists());

        let failing = CommandObjective {
            program: "sh".to_string(),
            args: vec!["-c".into(), "exit 3".into(), "sh".into()],
            weights_dir: dir.path().join("weights"),
        };
        assert!(matches!(
            failing.accuracy(&initial()),
            Err(OtError::ExternalEvaluationFailure { .. })
        ));
    }
}
