// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

/// Scalar field classification for descriptor generation.
#[derive(Clone)]
struct ScalarField {
    size: usize,
    alignment: usize,
    kind_tokens: proc_macro2::TokenStream,
}

/// `#[derive(Transmissible)]`: registers a struct with the wire descriptor
/// registry.
///
/// Generates the `Transmissible` impl (a derived descriptor with a field
/// layout table and an FNV-1a datatype code) plus the `bytemuck` pod
/// impls the registry bound requires.
///
/// Requirements, all checked at expansion time:
/// - `#[repr(C)]` (exactly; `packed`/`align` change the layout the
///   descriptor describes)
/// - named fields, at least one
/// - every field a scalar already in the registry (i8-i64, u8-u64,
///   f32/f64; `bool` is not plain-old-data and is rejected)
/// - no implicit padding anywhere, so the byte image is total
///
/// Example:
/// ```ignore
/// use tmpi::Transmissible;
///
/// #[derive(Clone, Copy, Transmissible)]
/// #[repr(C)]
/// struct Particle {
///     position: f64,
///     velocity: f64,
///     charge: i32,
///     species: u32,
/// }
/// ```
#[proc_macro_derive(Transmissible)]
pub fn derive_transmissible(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let type_name = name.to_string();
    let datatype_hash = compute_fnv1a_hash(&type_name);

    if let Err(err) = check_repr_c(&input) {
        return err.to_compile_error().into();
    }

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "Generic structs are not supported; descriptors are per concrete type",
        )
        .to_compile_error()
        .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return syn::Error::new_spanned(&input, "Only named fields are supported")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Only structs are supported")
                .to_compile_error()
                .into()
        }
    };

    if fields.is_empty() {
        return syn::Error::new_spanned(
            &input,
            "Empty structs have no wire representation; add a field",
        )
        .to_compile_error()
        .into();
    }

    struct FieldInfo {
        name: syn::Ident,
        scalar: ScalarField,
        offset: usize,
    }

    let mut field_infos = Vec::new();
    let mut current_offset = 0usize;
    let mut max_alignment = 1usize;

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return syn::Error::new_spanned(field, "Field must have a name")
                .to_compile_error()
                .into();
        };

        let Some(scalar) = get_scalar_field(&field.ty) else {
            return syn::Error::new_spanned(
                &field.ty,
                "Unsupported field type. Supported: i8-i64, u8-u64, f32, f64 \
                 (bool is not plain-old-data; use u8)",
            )
            .to_compile_error()
            .into();
        };

        // repr(C) would insert padding here; the descriptor describes a
        // total byte image, so the layout must not contain any.
        if align_to(current_offset, scalar.alignment) != current_offset {
            return syn::Error::new_spanned(
                field_name,
                format!(
                    "implicit padding before field `{field_name}`; \
                     order fields by decreasing alignment or pad explicitly"
                ),
            )
            .to_compile_error()
            .into();
        }

        max_alignment = max_alignment.max(scalar.alignment);
        field_infos.push(FieldInfo {
            name: field_name.clone(),
            scalar: scalar.clone(),
            offset: current_offset,
        });
        current_offset += scalar.size;
    }

    if align_to(current_offset, max_alignment) != current_offset {
        return syn::Error::new_spanned(
            &input.ident,
            "trailing padding in layout; order fields by decreasing alignment \
             or pad explicitly",
        )
        .to_compile_error()
        .into();
    }

    let total_size = current_offset as u32;
    let max_alignment_u8 = max_alignment as u8;

    let field_layouts: Vec<_> = field_infos
        .iter()
        .map(|f| {
            let name_str = f.name.to_string();
            let offset = f.offset as u32;
            let kind_tokens = &f.scalar.kind_tokens;
            quote! {
                ::tmpi::datatype::FieldLayout {
                    name: #name_str,
                    offset_bytes: #offset,
                    scalar: #kind_tokens,
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::tmpi::datatype::Transmissible for #name {
            const DESCRIPTOR: ::tmpi::datatype::Descriptor = ::tmpi::datatype::Descriptor {
                wire_name: #type_name,
                code: ::tmpi::raw::RawDatatype::derived(#datatype_hash),
                size_bytes: #total_size,
                alignment: #max_alignment_u8,
                fields: &[#(#field_layouts),*],
            };
        }

        // SAFETY: #[repr(C)], scalar-only fields, no padding (all checked
        // at expansion); `Pod`'s `Copy` supertrait bound still applies.
        unsafe impl ::tmpi::bytemuck::Zeroable for #name {}
        unsafe impl ::tmpi::bytemuck::Pod for #name {}
    };

    TokenStream::from(expanded)
}

/// Require exactly `#[repr(C)]`.
///
/// `packed` and `align` shift the very offsets the generated descriptor
/// publishes, so both are rejected rather than silently described wrong.
fn check_repr_c(input: &DeriveInput) -> Result<(), syn::Error> {
    let mut has_c = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                has_c = true;
                Ok(())
            } else {
                Err(meta.error("only #[repr(C)] is supported"))
            }
        })?;
    }
    if has_c {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Transmissible)] requires #[repr(C)]",
        ))
    }
}

/// Scalar layout facts for a field type.
fn get_scalar_field(ty: &syn::Type) -> Option<ScalarField> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.path.segments.len() != 1 {
        return None;
    }
    let segment = type_path.path.segments.last()?;

    let (size, alignment, kind) = match segment.ident.to_string().as_str() {
        "i8" => (1, 1, quote! { ::tmpi::datatype::ScalarKind::I8 }),
        "i16" => (2, 2, quote! { ::tmpi::datatype::ScalarKind::I16 }),
        "i32" => (4, 4, quote! { ::tmpi::datatype::ScalarKind::I32 }),
        "i64" => (8, 8, quote! { ::tmpi::datatype::ScalarKind::I64 }),
        "u8" => (1, 1, quote! { ::tmpi::datatype::ScalarKind::U8 }),
        "u16" => (2, 2, quote! { ::tmpi::datatype::ScalarKind::U16 }),
        "u32" => (4, 4, quote! { ::tmpi::datatype::ScalarKind::U32 }),
        "u64" => (8, 8, quote! { ::tmpi::datatype::ScalarKind::U64 }),
        "f32" => (4, 4, quote! { ::tmpi::datatype::ScalarKind::F32 }),
        "f64" => (8, 8, quote! { ::tmpi::datatype::ScalarKind::F64 }),
        _ => return None,
    };
    Some(ScalarField {
        size,
        alignment,
        kind_tokens: kind,
    })
}

/// Round `offset` up to the next multiple of `alignment`.
const fn align_to(offset: usize, alignment: usize) -> usize {
    (offset + alignment - 1) / alignment * alignment
}

/// FNV-1a hash of the type name, the derived datatype code's identity.
fn compute_fnv1a_hash(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
