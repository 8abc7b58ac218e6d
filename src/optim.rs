use crate::{common::*, params};

/// One probe of the objective at the image's current values: scalar loss and
/// the gradient of the loss with respect to the image, flattened.
#[derive(Debug)]
pub struct Evaluation {
    pub loss: f64,
    pub grad: Tensor,
}

/// Limited-memory BFGS over a single tensor.
///
/// tch does not ship libtorch's L-BFGS optimizer, so this implements the
/// standard two-loop recursion over a bounded history of curvature pairs,
/// with an Armijo backtracking line search. The caller supplies a
/// re-invokable `evaluate` function object; the line search calls it several
/// times per outer step, each time reading the image's current (mutated)
/// values. A step is applied only when it does not increase the loss, so the
/// sequence of accepted losses is non-increasing.
#[derive(Debug)]
pub struct Lbfgs {
    history: VecDeque<CurvaturePair>,
    history_size: usize,
    max_evals: usize,
}

#[derive(Debug)]
struct CurvaturePair {
    step: Tensor,       // s_k = x_{k+1} - x_k
    grad_delta: Tensor, // y_k = g_{k+1} - g_k
    rho: f64,           // 1 / (y_k . s_k)
}

impl Default for Lbfgs {
    fn default() -> Self {
        Self::new(params::LBFGS_HISTORY_SIZE, params::LBFGS_MAX_EVALS)
    }
}

impl Lbfgs {
    pub fn new(history_size: usize, max_evals: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            max_evals,
        }
    }

    /// Runs one outer optimization step, mutating `image` in place. Returns
    /// the loss at the accepted point (the starting loss when the line search
    /// finds no decrease and leaves the image untouched).
    pub fn step<F>(&mut self, image: &mut Tensor, mut evaluate: F) -> Result<f64>
    where
        F: FnMut(&Tensor) -> Result<Evaluation>,
    {
        let shape = image.size();

        let Evaluation {
            loss: initial_loss,
            grad,
        } = evaluate(image)?;
        if !initial_loss.is_finite() {
            return Ok(initial_loss);
        }

        let mut direction = self.search_direction(&grad);
        let mut slope = direction.dot(&grad).double_value(&[]);
        if slope >= 0.0 {
            // stale curvature produced a non-descent direction; fall back to
            // steepest descent
            self.history.clear();
            direction = grad.neg();
            slope = -grad.dot(&grad).double_value(&[]);
        }

        let origin = image.detach().copy();
        // a shallow clone shares storage with `image`, so writing through it
        // moves the image while `image` itself stays borrowable by `evaluate`
        let mut probe_view = image.shallow_clone();
        let mut move_to = |scale: f64| {
            let probe = &origin + (&direction * scale).view(shape.as_slice());
            tch::no_grad(|| probe_view.copy_(&probe));
        };

        // PyTorch's L-BFGS first-step heuristic keeps the initial probe small
        let mut scale = if self.history.is_empty() {
            let grad_norm = grad.abs().sum(Kind::Float).double_value(&[]);
            (1.0 / grad_norm).min(1.0)
        } else {
            1.0
        };

        let mut accepted: Option<(f64, f64)> = None;
        for _ in 0..self.max_evals {
            move_to(scale);
            let probe_loss = evaluate(image)?.loss;

            let sufficient =
                probe_loss <= initial_loss + params::LBFGS_SUFFICIENT_DECREASE * scale * slope;
            if probe_loss.is_finite() && sufficient {
                accepted = Some((scale, probe_loss));
                break;
            }
            if probe_loss.is_finite()
                && probe_loss < initial_loss
                && accepted.map_or(true, |(_, best)| probe_loss < best)
            {
                accepted = Some((scale, probe_loss));
            }
            scale *= 0.5;
        }

        let (scale, loss) = match accepted {
            Some(found) => found,
            None => {
                // no decrease anywhere along the ray; restore and report the
                // unchanged loss
                tch::no_grad(|| image.copy_(&origin));
                return Ok(initial_loss);
            }
        };

        move_to(scale);
        let new_grad = evaluate(image)?.grad;
        self.push_pair(&direction * scale, new_grad - grad);

        Ok(loss)
    }

    /// Two-loop recursion: approximates the inverse-Hessian product
    /// -H . grad from the stored curvature pairs.
    fn search_direction(&self, grad: &Tensor) -> Tensor {
        let mut q = grad.copy();
        let mut alphas = Vec::with_capacity(self.history.len());

        for pair in self.history.iter().rev() {
            let alpha = pair.rho * pair.step.dot(&q).double_value(&[]);
            q = q - &pair.grad_delta * alpha;
            alphas.push(alpha);
        }

        let gamma = match self.history.back() {
            Some(pair) => {
                let yy = pair.grad_delta.dot(&pair.grad_delta).double_value(&[]);
                1.0 / (pair.rho * yy)
            }
            None => 1.0,
        };
        let mut r = q * gamma;

        for (pair, &alpha) in self.history.iter().zip(alphas.iter().rev()) {
            let beta = pair.rho * pair.grad_delta.dot(&r).double_value(&[]);
            r = r + &pair.step * (alpha - beta);
        }

        r.neg()
    }

    fn push_pair(&mut self, step: Tensor, grad_delta: Tensor) {
        let curvature = grad_delta.dot(&step).double_value(&[]);
        if curvature <= params::LBFGS_CURVATURE_EPS {
            return;
        }
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(CurvaturePair {
            step,
            grad_delta,
            rho: 1.0 / curvature,
        });
    }
}
