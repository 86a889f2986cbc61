fn main() {
    if let Err(e) = kvmodel_codegen::build::generate_from_env() {
        panic!("kvmodel code generation failed:\n{e}");
    }
}
