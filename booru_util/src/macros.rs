#[macro_export]
macro_rules! opt {
    (, $default:ident) => {
        $default
    };
    ($optional:expr, $default:ident) => {
        $optional
    };
}

#[macro_export]
macro_rules! params_internal {
    ($vec:ident, required, $key:expr, $val:expr) => {
        $vec.push(($key, $val.to_string()));
    };
    ($vec:ident, optional, $key:expr, $val:expr) => {
        if let Some(ref v) = $val {
            $vec.push(($key, v.to_string()));
        }
    };
}

/// Build the query pairs of an upstream request.
/// `required` pairs are always emitted, `optional` ones only when the value is `Some`.
/// ```
/// use booru_util::build_params;
///
/// let pid = 3;
/// let api_key: Option<&str> = None;
/// let params = build_params! {
///     required pid,
///     required limit => 100,
///     optional api_key,
/// };
/// assert_eq!(params, vec![("pid".to_string(), "3".to_string()), ("limit".to_string(), "100".to_string())]);
/// ```
#[macro_export]
macro_rules! build_params {
    (
        $(
            $kind:ident $name:ident $( => $val:expr )?
        ),+ $(,)?
    ) => {
        {
            let mut params: Vec<(String, String)> = Vec::new();
            $(
                $crate::params_internal!(
                    params,
                    $kind,
                    stringify!($name).to_string(),
                    $crate::opt!($( $val )?, $name)
                );
            )+
            params
        }
    };
}
