//! # Wirecode Derive Macros
//!
//! This crate provides the procedural macros for `wirecode`. It automates the implementation
//! of `WireType`, `WireReflect` and `WireObject` for structs, and of `WireEnum`,
//! `WireType` and `WireValue` for unit enums.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives `WireType`, `WireReflect` and `WireObject` for a struct with named fields.
///
/// Field attributes:
/// * `#[wire(skip)]`: the field is transient and never serialized.
/// * `#[wire(base)]`: the field's fields are inherited and written before this type's own.
/// * `#[wire(rename = "name")]`: the field is written under another name.
#[proc_macro_derive(WireObject, attributes(wire))]
pub fn derive_wire_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new(name.span(), "WireObject does not support generic structs")
            .to_compile_error()
            .into();
    }

    let fields = match input.data {
        Data::Struct(ds) => match ds.fields {
            Fields::Named(named) => named.named,
            Fields::Unit => Default::default(),
            Fields::Unnamed(_) => {
                return syn::Error::new(name.span(), "WireObject requires named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(name.span(), "WireObject only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let mut wire_fields = Vec::new();
    let mut skipped = Vec::new();
    let mut base: Option<BaseField> = None;

    for field in fields {
        let attrs = match parse_attributes(&field.attrs) {
            Ok(res) => res,
            Err(e) => return e.to_compile_error().into(),
        };
        let Some(ident) = field.ident else {
            continue;
        };

        if attrs.is_base {
            if base.is_some() {
                return syn::Error::new(ident.span(), "only one field may be #[wire(base)]")
                    .to_compile_error()
                    .into();
            }
            base = Some(BaseField { ident, ty: field.ty });
        } else if attrs.skip {
            skipped.push(SkippedField {
                wire_name: attrs.rename.unwrap_or_else(|| ident.to_string()),
                ty: field.ty,
            });
        } else {
            wire_fields.push(WireField {
                wire_name: attrs.rename.unwrap_or_else(|| ident.to_string()),
                ident,
                ty: field.ty,
            });
        }
    }

    let impl_type = generate_object_type(&name);
    let impl_reflect = generate_reflect(&name, &wire_fields, base.as_ref());
    let impl_object = generate_type_info(&name, &wire_fields, &skipped, base.as_ref());

    let expanded = quote! {
        #impl_type
        #impl_reflect
        #impl_object
    };

    TokenStream::from(expanded)
}

/// Derives `WireEnum`, `WireType` and `WireValue` for an enum whose variants carry no data.
///
/// Variant attribute `#[wire(rename = "NAME")]` changes the constant name on the wire.
#[proc_macro_derive(WireEnum, attributes(wire))]
pub fn derive_wire_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new(name.span(), "WireEnum does not support generic enums")
            .to_compile_error()
            .into();
    }

    let data_enum = match input.data {
        Data::Enum(de) => de,
        _ => {
            return syn::Error::new(name.span(), "WireEnum only supports enums")
                .to_compile_error()
                .into();
        }
    };

    if data_enum.variants.is_empty() {
        return syn::Error::new(name.span(), "WireEnum requires at least one variant")
            .to_compile_error()
            .into();
    }

    let mut constants = Vec::new();
    for variant in data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new(variant.ident.span(), "WireEnum variants cannot carry data")
                .to_compile_error()
                .into();
        }
        let attrs = match parse_attributes(&variant.attrs) {
            Ok(res) => res,
            Err(e) => return e.to_compile_error().into(),
        };
        if attrs.skip || attrs.is_base {
            return syn::Error::new(variant.ident.span(), "only #[wire(rename)] applies to variants")
                .to_compile_error()
                .into();
        }
        constants.push(EnumConstant {
            wire_name: attrs.rename.unwrap_or_else(|| variant.ident.to_string()),
            ident: variant.ident,
        });
    }

    TokenStream::from(generate_enum(&name, &constants))
}

// --- Internal Data Structures ---
struct WireField {
    ident: syn::Ident,
    ty: syn::Type,
    wire_name: String,
}
struct SkippedField {
    ty: syn::Type,
    wire_name: String,
}
struct BaseField {
    ident: syn::Ident,
    ty: syn::Type,
}
struct EnumConstant {
    ident: syn::Ident,
    wire_name: String,
}

#[derive(Default)]
struct WireAttributes {
    skip: bool,
    is_base: bool,
    rename: Option<String>,
}

fn parse_attributes(attrs: &[Attribute]) -> syn::Result<WireAttributes> {
    let mut parsed = WireAttributes::default();

    for attr in attrs {
        if attr.path().is_ident("wire") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("base") {
                    parsed.is_base = true;
                    return Ok(());
                }

                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    if s.value().is_empty() {
                        return Err(meta.error("rename requires a non-empty name"));
                    }
                    parsed.rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown wire attribute key. Supported: skip, base, rename"))
            })?;
        }
    }
    if parsed.skip && parsed.is_base {
        return Err(syn::Error::new_spanned(
            &attrs[0],
            "a field cannot be both #[wire(skip)] and #[wire(base)]",
        ));
    }
    Ok(parsed)
}

// --- Generator: WireType (objects) ---
fn generate_object_type(name: &syn::Ident) -> proc_macro2::TokenStream {
    quote! {
        impl ::wirecode::rt::WireType for #name {
            fn type_ref() -> ::wirecode::rt::TypeRef {
                ::wirecode::rt::TypeRef::new(concat!(module_path!(), "::", stringify!(#name)))
            }

            fn data_type() -> ::wirecode::rt::DataType {
                ::wirecode::rt::DataType::Other
            }

            fn nested_info() -> Option<::wirecode::rt::TypeInfo> {
                Some(<Self as ::wirecode::rt::WireObject>::type_info())
            }

            fn field_reflect(&self) -> Option<&dyn ::wirecode::rt::WireReflect> {
                Some(self)
            }

            fn field_reflect_mut(&mut self) -> Option<&mut dyn ::wirecode::rt::WireReflect> {
                Some(self)
            }
        }
    }
}

// --- Generator: WireReflect ---
fn generate_reflect(
    name: &syn::Ident,
    fields: &[WireField],
    base: Option<&BaseField>,
) -> proc_macro2::TokenStream {
    let get_arms = fields.iter().map(|f| {
        let fname = &f.ident;
        let wire_name = &f.wire_name;
        quote! { #wire_name => Some(&self.#fname as &dyn ::wirecode::rt::WireField), }
    });
    let get_mut_arms = fields.iter().map(|f| {
        let fname = &f.ident;
        let wire_name = &f.wire_name;
        quote! { #wire_name => Some(&mut self.#fname as &mut dyn ::wirecode::rt::WireField), }
    });

    // Inherited fields are looked up through the base.
    let (get_fallback, get_mut_fallback) = match base {
        Some(b) => {
            let bname = &b.ident;
            let bty = &b.ty;
            (
                quote! { _ => <#bty as ::wirecode::rt::WireReflect>::field(&self.#bname, name), },
                quote! { _ => <#bty as ::wirecode::rt::WireReflect>::field_mut(&mut self.#bname, name), },
            )
        }
        None => (quote! { _ => None, }, quote! { _ => None, }),
    };

    quote! {
        impl ::wirecode::rt::WireReflect for #name {
            fn field(&self, name: &str) -> Option<&dyn ::wirecode::rt::WireField> {
                match name {
                    #(#get_arms)*
                    #get_fallback
                }
            }

            fn field_mut(&mut self, name: &str) -> Option<&mut dyn ::wirecode::rt::WireField> {
                match name {
                    #(#get_mut_arms)*
                    #get_mut_fallback
                }
            }
        }
    }
}

// --- Generator: WireObject ---
fn generate_type_info(
    name: &syn::Ident,
    fields: &[WireField],
    skipped: &[SkippedField],
    base: Option<&BaseField>,
) -> proc_macro2::TokenStream {
    let field_infos = fields.iter().map(|f| {
        let ty = &f.ty;
        let wire_name = &f.wire_name;
        quote! { ::wirecode::rt::FieldInfo::of::<#ty>(#wire_name), }
    });
    let skipped_infos = skipped.iter().map(|f| {
        let ty = &f.ty;
        let wire_name = &f.wire_name;
        quote! { ::wirecode::rt::FieldInfo::opaque(#wire_name, stringify!(#ty)).transient(), }
    });
    let with_base = base.map(|b| {
        let bty = &b.ty;
        quote! { .with_base(<#bty as ::wirecode::rt::WireObject>::type_info) }
    });

    quote! {
        impl ::wirecode::rt::WireObject for #name {
            fn type_info() -> ::wirecode::rt::TypeInfo {
                ::wirecode::rt::TypeInfo::new(
                    <Self as ::wirecode::rt::WireType>::type_ref(),
                    vec![
                        #(#field_infos)*
                        #(#skipped_infos)*
                    ],
                )
                #with_base
            }
        }
    }
}

// --- Generator: enums ---
fn generate_enum(name: &syn::Ident, constants: &[EnumConstant]) -> proc_macro2::TokenStream {
    let wire_names: Vec<&String> = constants.iter().map(|c| &c.wire_name).collect();
    let name_arms = constants.iter().map(|c| {
        let ident = &c.ident;
        let wire_name = &c.wire_name;
        quote! { Self::#ident => #wire_name, }
    });
    let ordinal_arms = constants.iter().enumerate().map(|(i, c)| {
        let ident = &c.ident;
        let ordinal = i32::try_from(i).unwrap_or(i32::MAX);
        quote! { Self::#ident => #ordinal, }
    });
    let lookup_arms = constants.iter().map(|c| {
        let ident = &c.ident;
        let wire_name = &c.wire_name;
        quote! { #wire_name => Some(Self::#ident), }
    });

    quote! {
        impl ::wirecode::rt::WireEnum for #name {
            fn qualified_name() -> &'static str {
                concat!(module_path!(), "::", stringify!(#name))
            }

            fn simple_name() -> &'static str {
                stringify!(#name)
            }

            fn constants() -> &'static [&'static str] {
                &[#(#wire_names),*]
            }

            fn constant_name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            fn ordinal(&self) -> i32 {
                match self {
                    #(#ordinal_arms)*
                }
            }

            fn from_constant(name: &str) -> Option<Self> {
                match name {
                    #(#lookup_arms)*
                    _ => None,
                }
            }
        }

        impl ::wirecode::rt::WireType for #name {
            fn type_ref() -> ::wirecode::rt::TypeRef {
                ::wirecode::rt::TypeRef::with_supertypes(
                    concat!(module_path!(), "::", stringify!(#name)),
                    &["Enum"],
                )
            }

            fn data_type() -> ::wirecode::rt::DataType {
                ::wirecode::rt::DataType::Enum
            }

            fn codec() -> Option<::wirecode::rt::FieldCodec> {
                Some(::wirecode::rt::FieldCodec::of::<Self>())
            }
        }

        impl ::wirecode::rt::WireValue for #name {
            fn write_value(
                &self,
                proto: &mut dyn ::wirecode::rt::WireProtocol,
                name: &str,
            ) -> ::wirecode::rt::WireResult<()> {
                ::wirecode::rt::write_enum(self, proto, name)
            }

            fn read_value(
                proto: &mut dyn ::wirecode::rt::WireProtocol,
                header: &::wirecode::rt::WireFieldHeader,
            ) -> ::wirecode::rt::WireResult<Option<Self>> {
                ::wirecode::rt::read_enum(proto, header)
            }
        }
    }
}
