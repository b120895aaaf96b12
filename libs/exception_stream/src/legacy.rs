//! Debug data keys that older writers used in place of the context section.
//!
//! When such a key is decoded with a value of the expected shape, it sets the
//! matching [`ContextInfo`] field instead of becoming a debug entry.

use byte_stream::TaggedValue;
use byte_stream::datetime::from_ctime;
use uuid::Uuid;

use crate::context::ContextInfo;
use crate::node::ExceptionNode;

/// Applies a value to the context. Returns `false` if the value has the
/// wrong shape.
type Apply = fn(&mut ContextInfo, &TaggedValue) -> bool;

static KEYS: &[(&str, Apply)] = &[
    ("ProcessID", apply_pid),
    ("ComputerName", apply_machine_name),
    ("ExceptionIdentifier", apply_exception_id),
    ("UnixExceptionTime", apply_exception_time),
    ("FileID", apply_file_id),
    ("ActionID", apply_action_id),
    ("DatabaseServer", apply_database_server),
    ("DatabaseName", apply_database_name),
    ("FPSContext", apply_fps_context),
];

/// Redirects a decoded debug entry into the node's context.
///
/// Returns whether the entry was consumed.
pub fn apply(node: &mut ExceptionNode, key: &str, value: &TaggedValue) -> bool {
    let Some(&(name, apply)) = KEYS.iter().find(|(k, _)| *k == key) else {
        return false;
    };

    let handled = apply(node.context_mut(), value);
    if handled {
        log::debug!("moved legacy debug value {name} into the exception context");
    } else {
        log::debug!("kept legacy debug value {name} with unexpected value {value:?}");
    }

    handled
}

/// Reads an integer either from an integer value or a decimal string.
fn int<T: TryFrom<i64>>(value: &TaggedValue) -> Option<T> {
    let wide = match value {
        TaggedValue::String(s) => s.trim().parse().ok()?,
        other => other.as_i64()?,
    };

    T::try_from(wide).ok()
}

fn text(value: &TaggedValue) -> Option<String> {
    value.as_str().map(str::to_owned)
}

macro_rules! apply_fns {
    ($($name:ident => $field:ident = $read:ident;)*) => {
        $(
            fn $name(context: &mut ContextInfo, value: &TaggedValue) -> bool {
                match $read(value) {
                    Some(v) => {
                        context.$field = v;
                        true
                    },
                    None => false,
                }
            }
        )*
    };
}

apply_fns! {
    apply_pid => pid = int;
    apply_machine_name => machine_name = text;
    apply_file_id => file_id = int;
    apply_action_id => action_id = int;
    apply_database_server => database_server = text;
    apply_database_name => database_name = text;
    apply_fps_context => fps_context = text;
}

fn apply_exception_id(context: &mut ContextInfo, value: &TaggedValue) -> bool {
    let id = match value {
        TaggedValue::Guid(id) => *id,
        TaggedValue::String(s) => match Uuid::parse_str(s.trim()) {
            Ok(id) => id,
            Err(_) => return false,
        },
        _ => return false,
    };

    context.exception_id = id;
    true
}

fn apply_exception_time(context: &mut ContextInfo, value: &TaggedValue) -> bool {
    let time = match value {
        TaggedValue::DateTime(time) => Some(*time),
        other => match int::<i64>(other).map(from_ctime) {
            Some(Ok(time)) => time,
            _ => return false,
        },
    };

    context.exception_time = time;
    true
}
