/// Declare a block of nullable numeric columns.
///
/// Generates the struct plus `FIELDS` (column names, in order),
/// `values()` and `from_values()` so storage code can bind and read the whole
/// block without repeating every column, and `validate_finite()`.
macro_rules! figure_set {
  (
    $(#[$meta:meta])*
    pub struct $name:ident {
      $( $(#[$fmeta:meta])* $field:ident ),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct $name {
      $( $(#[$fmeta])* pub $field: Option<f64>, )+
    }

    impl $name {
      pub const FIELDS: &'static [&'static str] = &[ $( stringify!($field) ),+ ];

      pub fn values(&self) -> Vec<Option<f64>> {
        vec![ $( self.$field ),+ ]
      }

      /// Rebuild from values in `FIELDS` order. Missing trailing values are
      /// treated as null.
      pub fn from_values(values: &[Option<f64>]) -> Self {
        let mut it = values.iter().copied();
        Self { $( $field: it.next().flatten(), )+ }
      }

      /// Reject NaN and infinities; SQLite would store them as NULL.
      pub fn validate_finite(&self, entity: &'static str) -> $crate::Result<()> {
        $(
          if let Some(v) = self.$field
            && !v.is_finite()
          {
            return Err($crate::Error::validation(
              entity,
              stringify!($field),
              format!("{v} is not a finite number"),
            ));
          }
        )+
        Ok(())
      }

      /// Number of populated (non-null) fields.
      pub fn populated(&self) -> usize {
        self.values().iter().filter(|v| v.is_some()).count()
      }
    }
  };
}
