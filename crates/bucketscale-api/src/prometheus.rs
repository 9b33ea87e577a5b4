//! Prometheus text exposition of trigger decisions.
//!
//! `bucketscale_desired_replicas` is the value an external autoscaler
//! reconciles a workload against.

use bucketscale_core::TriggerHealth;
use bucketscale_trigger::TriggerStatus;

/// Render trigger statuses as gauges labelled by trigger and bucket.
///
/// Triggers without a decision yet are left out of the replica and
/// object-count gauges.
pub fn render_prometheus(statuses: &[TriggerStatus]) -> String {
    let mut out = String::new();

    out.push_str("# HELP bucketscale_desired_replicas Replica count the trigger currently asks for.\n");
    out.push_str("# TYPE bucketscale_desired_replicas gauge\n");
    for s in statuses {
        if let Some(desired) = s.desired_replicas {
            out.push_str(&format!(
                "bucketscale_desired_replicas{{{}}} {}\n",
                labels(s),
                desired
            ));
        }
    }

    out.push_str("# HELP bucketscale_object_count Objects pending in the bucket at the last successful poll.\n");
    out.push_str("# TYPE bucketscale_object_count gauge\n");
    for s in statuses {
        if let Some(count) = s.sample_count {
            out.push_str(&format!(
                "bucketscale_object_count{{{}}} {}\n",
                labels(s),
                count
            ));
        }
    }

    out.push_str("# HELP bucketscale_consecutive_fetch_failures Failed polls since the last success.\n");
    out.push_str("# TYPE bucketscale_consecutive_fetch_failures gauge\n");
    for s in statuses {
        out.push_str(&format!(
            "bucketscale_consecutive_fetch_failures{{{}}} {}\n",
            labels(s),
            s.consecutive_failures
        ));
    }

    out.push_str("# HELP bucketscale_trigger_degraded 1 when credentials keep being rejected.\n");
    out.push_str("# TYPE bucketscale_trigger_degraded gauge\n");
    for s in statuses {
        out.push_str(&format!(
            "bucketscale_trigger_degraded{{{}}} {}\n",
            labels(s),
            u8::from(s.health == TriggerHealth::Degraded)
        ));
    }

    out
}

fn labels(s: &TriggerStatus) -> String {
    format!(
        "trigger=\"{}\",bucket=\"{}\"",
        escape(&s.name),
        escape(&s.bucket)
    )
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
