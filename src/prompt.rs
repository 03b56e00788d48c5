// Field lines end in two spaces (markdown hard breaks); keep them when editing.
/// Instruction sent with the image for the initial description request.
pub const VEHICLE_PROMPT: &str = concat!(
    "\n",
    "You are an automobile expert tasked with providing a detailed overview of any vehicle.\n",
    "The information should be presented in a structured format as follows:\n",
    "\n",
    "Brand: Name of the vehicle brand.  \n",
    "Model: Specific model of the vehicle.  \n",
    "Launch Year: Since when the vehicle is available in the market.  \n",
    "Key Features: Include the engine capacity, type (e.g., scooter, motorcycle, sedan, SUV), and top 3 special features (e.g., ABS, digital display, storage capacity, safety features).  \n",
    "Mileage: Provide the average mileage in km/l (kilometers per liter).  \n",
    "Average Price in INR: Mention the price range of the vehicle model in Indian Rupees.  \n",
    "Other Details: Include information on maintenance costs, additional benefits, and any unique selling points.  \n",
    "Approximate Resale Value: Estimate the resale value of the vehicle after 10 years in Indian Rupees.\n",
);

/// Name the assistant answers under in follow-up chats.
pub const ASSISTANT_NAME: &str = "AutoSage";

/// Build a follow-up prompt from the instruction, the stored description and the new question.
///
/// The whole context is resent on every question; earlier chat turns are not included.
pub fn build_followup_prompt(raw_response: &str, question: &str) -> String {
    let mut prompt = String::with_capacity(VEHICLE_PROMPT.len() + raw_response.len() + question.len() + 64);

    prompt.push_str(VEHICLE_PROMPT);
    prompt.push_str("\n\nVehicle Info:\n");
    prompt.push_str(raw_response);
    prompt.push_str("\n\nUser: ");
    prompt.push_str(question);
    prompt.push('\n');
    prompt.push_str(ASSISTANT_NAME);
    prompt.push(':');

    prompt
}
