mod fallback;
mod openai_compatible;
mod reliability;
