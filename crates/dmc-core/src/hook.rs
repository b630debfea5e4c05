//! Policy override hook.
//!
//! A [`PolicyOverride`] may tighten or relax thresholds per call, based on the
//! typed context. It is consulted before any guard runs. Whatever happens
//! inside the hook, evaluation continues: an error, a panic, or an
//! out-of-domain policy all fall back to the caller's base policy.

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::context::GuardContext;
use crate::error::{OverrideError, PolicyError};
use crate::legacy::RiskPolicy;
use crate::policy::GuardPolicy;

/// A threshold set a hook may replace. Hook output is only used when it
/// validates.
pub trait OverridablePolicy: Clone {
    fn validate(&self) -> Result<(), PolicyError>;
}

impl OverridablePolicy for GuardPolicy {
    fn validate(&self) -> Result<(), PolicyError> {
        GuardPolicy::validate(self)
    }
}

impl OverridablePolicy for RiskPolicy {
    fn validate(&self) -> Result<(), PolicyError> {
        RiskPolicy::validate(self)
    }
}

/// Per-call policy adjustment.
///
/// Defaults to the generic pipeline's types; the market-making profile uses
/// `PolicyOverride<RiskPolicy, LegacyContext>`.
pub trait PolicyOverride<P = GuardPolicy, C = GuardContext>: Send + Sync {
    /// Return the policy to evaluate with.
    fn adjust(&self, base: &P, context: &C) -> Result<P, OverrideError>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "policy_override"
    }
}

impl<P, C, F> PolicyOverride<P, C> for F
where
    F: Fn(&P, &C) -> Result<P, OverrideError> + Send + Sync,
{
    fn adjust(&self, base: &P, context: &C) -> Result<P, OverrideError> {
        self(base, context)
    }
}

/// Apply `hook` to `base`, falling back to `base` on any hook failure.
pub fn resolve_policy<'a, P, C>(
    hook: Option<&dyn PolicyOverride<P, C>>,
    base: &'a P,
    context: &C,
) -> Cow<'a, P>
where
    P: OverridablePolicy,
{
    let Some(hook) = hook else {
        return Cow::Borrowed(base);
    };

    let adjusted = catch_unwind(AssertUnwindSafe(|| hook.adjust(base, context)));
    match adjusted {
        Ok(Ok(policy)) => match OverridablePolicy::validate(&policy) {
            Ok(()) => {
                debug!(hook = hook.name(), "Policy override applied");
                Cow::Owned(policy)
            }
            Err(e) => {
                warn!(
                    hook = hook.name(),
                    error = %e,
                    "Policy override returned an invalid policy, using base policy"
                );
                Cow::Borrowed(base)
            }
        },
        Ok(Err(e)) => {
            warn!(hook = hook.name(), error = %e, "Policy override failed, using base policy");
            Cow::Borrowed(base)
        }
        Err(_) => {
            warn!(hook = hook.name(), "Policy override panicked, using base policy");
            Cow::Borrowed(base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmc_types::Action;

    fn resolve<'a>(
        hook: &dyn PolicyOverride,
        base: &'a GuardPolicy,
        context: &GuardContext,
    ) -> Cow<'a, GuardPolicy> {
        resolve_policy(Some(hook), base, context)
    }

    struct Tighten;

    impl PolicyOverride for Tighten {
        fn adjust(&self, base: &GuardPolicy, _: &GuardContext) -> Result<GuardPolicy, OverrideError> {
            Ok(base.clone().with_staleness_ms(10))
        }

        fn name(&self) -> &str {
            "tighten"
        }
    }

    #[test]
    fn no_hook_borrows_base() {
        let base = GuardPolicy::default();
        let resolved = resolve_policy::<GuardPolicy, GuardContext>(None, &base, &GuardContext::default());
        assert!(matches!(resolved, Cow::Borrowed(_)));
    }

    #[test]
    fn successful_hook_replaces_policy() {
        let base = GuardPolicy::default();
        let resolved = resolve(&Tighten, &base, &GuardContext::default());
        assert_eq!(resolved.staleness_ms, 10);
    }

    #[test]
    fn closure_hook_sees_context() {
        let base = GuardPolicy::default();
        let hook = |base: &GuardPolicy, ctx: &GuardContext| -> Result<GuardPolicy, OverrideError> {
            let action = if ctx.now_ms > 100.0 { Action::Stop } else { Action::Hold };
            Ok(base.clone().with_fail_closed_action(action))
        };
        let resolved = resolve(&hook, &base, &GuardContext::at(200));
        assert_eq!(resolved.fail_closed_action, Action::Stop);
    }

    #[test]
    fn failing_hook_falls_back() {
        let base = GuardPolicy::default();
        let hook = |_: &GuardPolicy, _: &GuardContext| -> Result<GuardPolicy, OverrideError> {
            Err(OverrideError::Unavailable("remote config down".into()))
        };
        let resolved = resolve(&hook, &base, &GuardContext::default());
        assert_eq!(*resolved, base);
    }

    #[test]
    fn panicking_hook_falls_back() {
        let base = GuardPolicy::default();
        let hook = |_: &GuardPolicy, _: &GuardContext| -> Result<GuardPolicy, OverrideError> {
            panic!("hook bug")
        };
        let resolved = resolve(&hook, &base, &GuardContext::default());
        assert_eq!(*resolved, base);
    }

    #[test]
    fn risk_policy_hook() {
        use crate::legacy::LegacyContext;

        let base = RiskPolicy::default();
        let widen = |base: &RiskPolicy, _: &LegacyContext| -> Result<RiskPolicy, OverrideError> {
            Ok(RiskPolicy {
                max_spread_bps: base.max_spread_bps * 2.0,
                ..base.clone()
            })
        };
        let hook: &dyn PolicyOverride<RiskPolicy, LegacyContext> = &widen;
        let resolved = resolve_policy(Some(hook), &base, &LegacyContext::default());
        assert_eq!(resolved.max_spread_bps, 1_000.0);

        let broken = |base: &RiskPolicy, _: &LegacyContext| -> Result<RiskPolicy, OverrideError> {
            Ok(RiskPolicy {
                min_depth: f64::NAN,
                ..base.clone()
            })
        };
        let hook: &dyn PolicyOverride<RiskPolicy, LegacyContext> = &broken;
        let resolved = resolve_policy(Some(hook), &base, &LegacyContext::default());
        assert_eq!(*resolved, base);
    }

    #[test]
    fn invalid_hook_policy_falls_back() {
        let base = GuardPolicy::default();
        let hook = |base: &GuardPolicy, _: &GuardContext| -> Result<GuardPolicy, OverrideError> {
            Ok(base.clone().with_max_error_rate(f64::NAN))
        };
        let resolved = resolve(&hook, &base, &GuardContext::default());
        assert_eq!(*resolved, base);
    }
}
