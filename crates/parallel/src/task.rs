//! Task wrapper
//!
//! Wraps a single callable and converts every failure it produces (returned
//! errors and panics alike) into a [`TaskError`] value.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

/// Outcome of a single task invocation
pub type TaskOutcome<T> = Result<T, TaskError>;

/// Dynamically-typed argument tuple for JSON tasks
pub type JsonArguments = Vec<serde_json::Value>;

/// Kind of captured task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// The callable returned an error
    Failed,
    /// The callable panicked
    Panicked,
    /// The argument tuple did not match what the callable expects
    InvalidArguments,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Panicked => write!(f, "panicked"),
            Self::InvalidArguments => write!(f, "invalid arguments"),
        }
    }
}

/// A failure captured from a task invocation
///
/// Produced in place of the task's return value; never raised across the
/// worker boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("task {kind}: {message}")]
pub struct TaskError {
    /// What went wrong
    pub kind: TaskErrorKind,

    /// Error message
    pub message: String,

    /// Type name of the originating error, when known
    pub error_type: Option<String>,
}

impl TaskError {
    /// Create a failure returned by the callable
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Failed,
            message: message.into(),
            error_type: None,
        }
    }

    /// Create a failure caused by a panic inside the callable
    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Panicked,
            message: message.into(),
            error_type: None,
        }
    }

    /// Create a failure caused by a mismatched argument tuple
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::InvalidArguments,
            message: message.into(),
            error_type: None,
        }
    }

    /// Capture a standard error, recording its type name
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::failed(err.to_string()).with_type(std::any::type_name::<E>())
    }

    /// Set the originating error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Whether this failure came from a panic
    pub fn is_panic(&self) -> bool {
        self.kind == TaskErrorKind::Panicked
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::failed(format!("{:#}", err))
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::failed(message)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(&err)
    }
}

type TaskFn<A, T> = dyn Fn(A) -> TaskOutcome<T> + Send + Sync;

/// Wraps a callable so that running it never panics or returns early
///
/// # Example
///
/// ```
/// use slim_parallel::TaskWrapper;
///
/// let task = TaskWrapper::new(|(a, b): (i64, String)| {
///     if a < 0 {
///         return Err("negative");
///     }
///     Ok(a + b.len() as i64)
/// });
///
/// assert_eq!(task.run((1, "a".to_string())), Ok(2));
/// assert!(task.run((-1, "a".to_string())).is_err());
/// ```
pub struct TaskWrapper<A, T> {
    name: Arc<str>,
    func: Arc<TaskFn<A, T>>,
}

impl<A, T> Clone for TaskWrapper<A, T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A, T> fmt::Debug for TaskWrapper<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWrapper")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<A, T> TaskWrapper<A, T> {
    /// Wrap a fallible callable whose error converts into [`TaskError`]
    pub fn new<F, E>(func: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
        E: Into<TaskError>,
    {
        Self::from_boxed(Arc::new(move |args| func(args).map_err(Into::into)))
    }

    /// Wrap a callable returning any standard error
    ///
    /// The error's type name is kept in [`TaskError::error_type`].
    pub fn from_std_error<F, E>(func: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
        E: std::error::Error + 'static,
    {
        Self::from_boxed(Arc::new(move |args| {
            func(args).map_err(|e| TaskError::from_error(&e))
        }))
    }

    /// Wrap a callable that cannot return an error (it may still panic)
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::from_boxed(Arc::new(move |args| Ok(func(args))))
    }

    fn from_boxed(func: Arc<TaskFn<A, T>>) -> Self {
        Self {
            name: Arc::from("task"),
            func,
        }
    }

    /// Set the name used in logs
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the callable with one argument tuple
    ///
    /// Returned errors and panics both come back as `Err(TaskError)`.
    pub fn run(&self, args: A) -> TaskOutcome<T> {
        match catch_unwind(AssertUnwindSafe(|| (self.func)(args))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(task = %self.name, %message, "Task panicked");
                Err(TaskError::panicked(message))
            }
        }
    }
}

impl TaskWrapper<JsonArguments, serde_json::Value> {
    /// Wrap a typed callable behind JSON arguments
    ///
    /// The argument list is deserialized into `P` (usually a tuple), so a
    /// wrong number or type of arguments becomes an
    /// [`TaskErrorKind::InvalidArguments`] outcome for that invocation only.
    ///
    /// ```
    /// use serde_json::json;
    /// use slim_parallel::{TaskErrorKind, TaskWrapper};
    ///
    /// let task = TaskWrapper::from_json(|(a, b): (i64, String)| {
    ///     Ok::<_, String>(format!("{a}{b}"))
    /// });
    ///
    /// assert_eq!(task.run(vec![json!(1), json!("a")]), Ok(json!("1a")));
    /// let err = task.run(vec![json!(1)]).unwrap_err();
    /// assert_eq!(err.kind, TaskErrorKind::InvalidArguments);
    /// ```
    pub fn from_json<P, R, E, F>(func: F) -> Self
    where
        P: DeserializeOwned,
        R: Serialize,
        E: Into<TaskError>,
        F: Fn(P) -> Result<R, E> + Send + Sync + 'static,
    {
        Self::from_boxed(Arc::new(move |args: JsonArguments| {
            let arity = args.len();
            let params: P = serde_json::from_value(serde_json::Value::Array(args)).map_err(
                |e| TaskError::invalid_arguments(format!("{} (got {} arguments)", e, arity)),
            )?;
            let output = func(params).map_err(Into::<TaskError>::into)?;
            serde_json::to_value(output).map_err(TaskError::from)
        }))
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
